//! `vibe-core` — shared vocabulary for the personal-cloud core.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifier newtypes, the permission-key shape, and the error taxonomy every
//! other crate maps into.

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::{AppId, Did, ObjectId, PermissionKey};
