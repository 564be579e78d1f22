//! Document CRUD boundary.
//!
//! This module defines the storage-agnostic abstraction for revisioned JSON
//! documents, plus the two backends: a CouchDB-style HTTP client and an
//! in-memory store for development and tests.

pub mod couch;
pub mod in_memory;
pub mod r#trait;

pub use couch::CouchDocumentStore;
pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{BulkEntryResult, BulkOutcome, BulkStatus, Document, DocumentStore, WriteOk};
