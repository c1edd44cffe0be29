//! Domain model for the user record store.
//!
//! # Invariants
//! - `User` is the only persisted entity; it has no relations.
//! - Deletion is a hard delete; there is no tombstone or version history.

pub mod user;
