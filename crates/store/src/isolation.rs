//! Per-identity data isolation.
//!
//! Every identity owns exactly one logical database, named deterministically
//! from the DID. Logical collections share that database via the id
//! convention `<collection>/<docId>`.

use std::sync::Arc;

use vibe_core::Did;

use crate::document::DocumentStore;
use crate::error::StoreError;

/// Prefix of every per-user database name.
pub const USER_DB_PREFIX: &str = "vibe-userdata-";

/// Shared database holding user records, app grants and claim codes.
pub const SYSTEM_DB: &str = "vibe-system";

/// Deterministic per-user database name. Pure.
///
/// The backend only accepts lowercase `[a-z0-9_$()+/-]` names, so every other
/// byte is escaped as `-xx-` (two lowercase hex digits). The escape is
/// injective: `-` itself is escaped, uppercase letters are escaped rather
/// than folded, so DIDs differing only by case, or by `:` vs `-`, never
/// collide.
pub fn user_db_name(did: &Did) -> String {
    let mut name = String::with_capacity(USER_DB_PREFIX.len() + did.as_str().len());
    name.push_str(USER_DB_PREFIX);
    for byte in did.as_str().bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'$' | b'(' | b')' | b'+' | b'/' => {
                name.push(byte as char)
            }
            other => {
                name.push('-');
                name.push_str(&format!("{other:02x}"));
                name.push('-');
            }
        }
    }
    name
}

/// Database provisioning over the document-store collaborator.
#[derive(Clone)]
pub struct DataIsolation {
    store: Arc<dyn DocumentStore>,
}

impl DataIsolation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the shared system database if absent. Idempotent.
    pub async fn ensure_system_database(&self) -> Result<(), StoreError> {
        self.store.ensure_database(SYSTEM_DB).await
    }

    /// Create the identity's database if absent. Idempotent; returns the name.
    pub async fn ensure_user_database(&self, did: &Did) -> Result<String, StoreError> {
        let name = user_db_name(did);
        self.store.ensure_database(&name).await?;
        Ok(name)
    }

    pub async fn user_database_exists(&self, did: &Did) -> Result<bool, StoreError> {
        self.store.database_exists(&user_db_name(did)).await
    }

    /// Destroy the identity's database and everything in it.
    pub async fn destroy_user_database(&self, did: &Did) -> Result<(), StoreError> {
        self.store.delete_database(&user_db_name(did)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(s: &str) -> Did {
        Did::from_encoded(s.to_string())
    }

    #[test]
    fn naming_is_deterministic() {
        let d = did("did:vibe:zAbC123");
        assert_eq!(user_db_name(&d), user_db_name(&d));
    }

    #[test]
    fn colon_escapes_to_hex() {
        let d = did("did:vibe:zabc");
        assert_eq!(user_db_name(&d), "vibe-userdata-did-3a-vibe-3a-zabc");
    }

    #[test]
    fn adversarial_pairs_do_not_collide() {
        // `:` vs `-` in the body.
        let a = did("did:vibe:za:b");
        let b = did("did:vibe:za-b");
        assert_ne!(user_db_name(&a), user_db_name(&b));

        // Case-only difference.
        let c = did("did:vibe:zAbc");
        let d = did("did:vibe:zabc");
        assert_ne!(user_db_name(&c), user_db_name(&d));
    }

    #[test]
    fn output_is_backend_legal() {
        let d = did("did:vibe:zXyZ!@#-_9");
        let name = user_db_name(&d);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || "_$()+/-".contains(c)));
    }
}
