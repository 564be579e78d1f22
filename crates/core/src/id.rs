//! Strongly-typed identifiers used across the personal-cloud core.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Method prefix for all identities served by this system.
pub const DID_PREFIX: &str = "did:vibe:";

/// Decentralized identifier of an owner identity.
///
/// Opaque string handle of the form `did:vibe:z…` (multibase base58btc body).
/// Construction validates the shape only; cryptographic decoding lives in
/// `vibe-identity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Wrap a string that already carries the `did:vibe:z` prefix.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if !s.starts_with(DID_PREFIX) {
            return Err(CoreError::bad_request(format!(
                "identifier does not start with '{DID_PREFIX}'"
            )));
        }
        if !s[DID_PREFIX.len()..].starts_with('z') {
            return Err(CoreError::bad_request(
                "identifier body is not multibase base58btc ('z' prefix)",
            ));
        }
        Ok(Self(s))
    }

    /// Internal constructor for callers that produced the string themselves
    /// (the DID codec). Skips validation.
    pub fn from_encoded(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Did {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a third-party client application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AppId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a stored binary object.
///
/// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests for
/// determinism.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ObjectId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::bad_request(format!("invalid object id: {e}")))
    }
}

/// Capability key gating a single action.
///
/// Opaque string of shape `<verb>:<collection>` (e.g. `read:notes`). Grant
/// documents map these keys to tri-state settings; this type never interprets
/// the verb beyond formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(String);

impl PermissionKey {
    pub fn new(verb: &str, collection: &str) -> Self {
        Self(format!("{verb}:{collection}"))
    }

    pub fn read(collection: &str) -> Self {
        Self::new("read", collection)
    }

    pub fn write(collection: &str) -> Self {
        Self::new("write", collection)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
