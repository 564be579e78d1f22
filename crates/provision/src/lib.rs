//! `vibe-provision` — identity lifecycle: bootstrap, creation, deletion.
//!
//! Provisioning runs out-of-band from request handling. Creation is a
//! two-step (user record, then database) with no rollback; deletion is an
//! ordered best-effort cascade across four subsystems, reported step by step
//! rather than hidden behind swallowed errors.

pub mod cascade;
pub mod claim;
pub mod error;
pub mod service;

pub use cascade::{CascadeReport, CascadeStep, StepOutcome};
pub use claim::{claim_code_doc_id, ClaimCode};
pub use error::ProvisionError;
pub use service::{user_doc_id, ProvisioningService, UserRecord};
