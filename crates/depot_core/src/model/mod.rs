//! Mapping contract between domain entities and storage records.
//!
//! # Responsibility
//! - Declare what an entity/record pair must provide to be persistable.
//! - Keep the contract polymorphic; no concrete entity types live here.

pub mod contract;
