mod common;

use common::{Contact, ContactRecord};
use depot_core::{FindRequest, MemoryBackend, Predicate, Repository, StorageRecord};
use uuid::Uuid;

fn repository() -> (Repository<Contact, MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new();
    (Repository::new(backend.clone()), backend)
}

#[test]
fn save_then_get_round_trips_all_mapped_fields() {
    let (repo, _) = repository();
    let contact = Contact::new("Ada Lovelace", "ada@example.com", 36);

    repo.save(&contact).unwrap();
    let loaded = repo.get_by_id(&contact.id).unwrap().unwrap();
    assert_eq!(loaded, contact);
}

#[test]
fn save_twice_keeps_one_record_with_latest_values() {
    let (repo, backend) = repository();
    let mut contact = Contact::new("Ada", "ada@example.com", 36);

    repo.save(&contact).unwrap();
    contact.email = "countess@example.com".to_string();
    contact.age = 37;
    repo.save(&contact).unwrap();

    assert_eq!(backend.row_count(ContactRecord::entity_name()), 1);
    let loaded = repo.get_by_id(&contact.id).unwrap().unwrap();
    assert_eq!(loaded.email, "countess@example.com");
    assert_eq!(loaded.age, 37);
}

#[test]
fn get_by_id_on_missing_identifier_returns_none() {
    let (repo, _) = repository();
    let loaded = repo.get_by_id(&Uuid::new_v4()).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn get_returns_first_predicate_match() {
    let (repo, _) = repository();
    repo.save(&Contact::new("Ada", "ada@example.com", 36)).unwrap();
    repo.save(&Contact::new("Grace", "grace@example.com", 45))
        .unwrap();

    let found = repo
        .get(&Predicate::eq("email", "grace@example.com"))
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "Grace");

    let missing = repo.get(&Predicate::eq("email", "nobody@example.com")).unwrap();
    assert!(missing.is_none());
}

#[test]
fn insert_twice_with_same_id_creates_two_records() {
    let (repo, backend) = repository();
    let contact = Contact::new("Ada", "ada@example.com", 36);

    repo.insert(&contact).unwrap();
    repo.insert(&contact).unwrap();

    assert_eq!(backend.row_count(ContactRecord::entity_name()), 2);
    let request =
        FindRequest::matching(Predicate::eq("id", contact.id));
    let duplicates = repo.find(&request).unwrap();
    assert_eq!(duplicates.len(), 2);
}

#[test]
fn save_after_duplicate_insert_updates_only_first_record() {
    let (repo, backend) = repository();
    let mut contact = Contact::new("Ada", "ada@example.com", 36);

    repo.insert(&contact).unwrap();
    repo.insert(&contact).unwrap();

    contact.age = 40;
    repo.save(&contact).unwrap();

    assert_eq!(backend.row_count(ContactRecord::entity_name()), 2);
    let request = FindRequest::matching(Predicate::eq("age", 40i64));
    assert_eq!(repo.find(&request).unwrap().len(), 1);
}

#[test]
fn remove_is_idempotent() {
    let (repo, backend) = repository();
    let contact = Contact::new("Ada", "ada@example.com", 36);
    repo.save(&contact).unwrap();

    repo.remove_by_id(&contact.id).unwrap();
    repo.remove_by_id(&contact.id).unwrap();

    assert_eq!(backend.row_count(ContactRecord::entity_name()), 0);
    assert!(repo.get_by_id(&contact.id).unwrap().is_none());
}

#[test]
fn remove_by_entity_deletes_its_record() {
    let (repo, _) = repository();
    let keep = Contact::new("Ada", "ada@example.com", 36);
    let gone = Contact::new("Grace", "grace@example.com", 45);
    repo.save(&keep).unwrap();
    repo.save(&gone).unwrap();

    repo.remove(&gone).unwrap();

    assert!(repo.get_by_id(&gone.id).unwrap().is_none());
    assert!(repo.get_by_id(&keep.id).unwrap().is_some());
}
