//! Blob metadata documents and object-key construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vibe_core::{Did, ObjectId};

/// Metadata record for one stored object.
///
/// Stored in the system database with the object key as the document id.
/// The key starts with the owner's DID, so ownership checks and per-owner
/// scans both come down to an id-prefix match. Keeping the record outside
/// the owner's per-user database lets the account-deletion sweep find it
/// after that database is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub original_filename: String,
    pub content_type: String,
    pub size: u64,
    pub owner_did: Did,
    pub collection: String,
    pub upload_timestamp: DateTime<Utc>,
    pub bucket: String,
}

/// Object key: `{ownerDid}/{collection}/{objectId}-{sanitizedFilename}`.
pub fn object_key(owner: &Did, collection: &str, object_id: &ObjectId, filename: &str) -> String {
    format!(
        "{}/{}/{}-{}",
        owner.as_str(),
        collection,
        object_id,
        sanitize_filename(filename)
    )
}

/// Strip anything that could escape the key shape: path separators and
/// characters outside `[A-Za-z0-9._-]` become `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// The owner segment of an object key, if well-formed.
pub fn key_owner(key: &str) -> Option<&str> {
    // The DID itself contains ':' but never '/', so the first segment is the
    // whole owner identifier.
    key.split('/').next().filter(|s| !s.is_empty())
}
