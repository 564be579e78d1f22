//! `vibe-auth` — token verification and the capability engine.
//!
//! This crate is intentionally decoupled from HTTP: it verifies bearer tokens
//! against the instance's HS256 secret and answers "may app X perform action
//! Y for user Z" by reading grant documents. It never prompts; the
//! interactive consent flow is an external collaborator that writes grants.

pub mod capability;
pub mod claims;

pub use capability::{grant_doc_id, AppGrant, CapabilityStore, GrantSetting};
pub use claims::{Hs256TokenCodec, JwtClaims, TokenError};
