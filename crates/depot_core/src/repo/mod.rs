//! Generic repository over pluggable storage sessions.
//!
//! # Responsibility
//! - Translate between domain entities and storage records through the
//!   mapping contract.
//! - Own exactly one lazily created session per repository instance.
//!
//! # Invariants
//! - Mutating operations commit before returning; commit failures always
//!   propagate to the caller.
//! - Absence is never an error: missing records read as `None` / empty.

pub mod repository;
