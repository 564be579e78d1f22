//! `vibe-blob` — binary objects with document-store metadata.
//!
//! Objects live in an S3-compatible store, metadata documents in the system
//! database keyed by object key. There is no distributed transaction between
//! the two:
//! the dual write is a saga with a structured reconciliation log (orphan
//! events) and deletes are ordered, idempotent, best-effort sweeps.
//! Ownership is absolute — only the owner identity may download or delete a
//! blob; there is no capability delegation for blobs.

pub mod error;
pub mod metadata;
pub mod object;
pub mod service;

pub use error::{BlobError, ObjectStoreError};
pub use metadata::{object_key, sanitize_filename, BlobMetadata};
pub use object::{InMemoryObjectStore, ObjectStore, S3ObjectStore};
pub use service::{BlobStore, BlobUpload, PresignedUpload, PurgeSummary};
