//! `vibe-store` — document-store boundary and per-user data isolation.
//!
//! The concrete wire protocol is out of scope; this crate treats the document
//! store as a CRUD + revision-conflict interface (`DocumentStore`) with a
//! CouchDB-style HTTP backend and an in-memory backend for development and
//! tests. On top of it sit the isolation scheme (one logical database per
//! identity) and the user-data write semantics (single writes conflict,
//! bulk writes report per-entry outcomes).

pub mod document;
pub mod error;
pub mod isolation;
pub mod userdata;

pub use document::{
    BulkEntryResult, BulkOutcome, BulkStatus, CouchDocumentStore, Document, DocumentStore,
    InMemoryDocumentStore, WriteOk,
};
pub use error::StoreError;
pub use isolation::{user_db_name, DataIsolation, SYSTEM_DB, USER_DB_PREFIX};
pub use userdata::UserData;
