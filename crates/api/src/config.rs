//! Startup configuration.
//!
//! Every environment variable is read and validated here, eagerly, before
//! the server accepts traffic. Optional backend blocks (document store,
//! object store, data-plane credentials) are all-or-nothing: a partially
//! set block is a startup error, not a silent fallback.

use std::net::SocketAddr;

use thiserror::Error;

use vibe_core::Did;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    /// A multi-variable block where only some variables are set.
    #[error("incomplete configuration block {block}: set all of {required}, or none")]
    Incomplete {
        block: &'static str,
        required: &'static str,
    },
}

/// CouchDB-style document-store connection.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// S3-compatible object-store connection (Minio-style explicit endpoint).
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Data-plane credentials handed to clients by `/api/v1/authdb`.
#[derive(Debug, Clone)]
pub struct AuthDbConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// The single identity this instance serves. `None` means unbound:
    /// every authenticated route fails closed with 503.
    pub instance_did: Option<Did>,
    pub couchdb: Option<CouchConfig>,
    pub s3: Option<S3Config>,
    pub blob_bucket: String,
    pub authdb: Option<AuthDbConfig>,
    /// Bootstrap claim code seeded at startup (idempotent).
    pub claim_code: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = var("VIBE_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "VIBE_BIND_ADDR",
                reason: format!("{e}"),
            })?;

        let jwt_secret = var("VIBE_JWT_SECRET").ok_or(ConfigError::Missing("VIBE_JWT_SECRET"))?;
        let jwt_issuer = var("VIBE_JWT_ISSUER").unwrap_or_else(|| "vibe-cloud".to_string());

        let instance_did = match var("VIBE_INSTANCE_DID") {
            Some(raw) => Some(Did::parse(raw).map_err(|e| ConfigError::Invalid {
                name: "VIBE_INSTANCE_DID",
                reason: e.to_string(),
            })?),
            None => None,
        };

        let couchdb = block(
            "document store",
            "VIBE_COUCHDB_URL, VIBE_COUCHDB_USER, VIBE_COUCHDB_PASSWORD",
            [
                var("VIBE_COUCHDB_URL"),
                var("VIBE_COUCHDB_USER"),
                var("VIBE_COUCHDB_PASSWORD"),
            ],
        )?
        .map(|[url, username, password]| CouchConfig {
            url,
            username,
            password,
        });

        let s3 = block(
            "object store",
            "VIBE_S3_ENDPOINT, VIBE_S3_REGION, VIBE_S3_ACCESS_KEY, VIBE_S3_SECRET_KEY",
            [
                var("VIBE_S3_ENDPOINT"),
                var("VIBE_S3_REGION"),
                var("VIBE_S3_ACCESS_KEY"),
                var("VIBE_S3_SECRET_KEY"),
            ],
        )?
        .map(|[endpoint, region, access_key, secret_key]| S3Config {
            endpoint,
            region,
            access_key,
            secret_key,
        });

        let authdb = block(
            "data-plane credentials",
            "VIBE_PUBLIC_DB_URL, VIBE_DB_USERNAME, VIBE_DB_PASSWORD",
            [
                var("VIBE_PUBLIC_DB_URL"),
                var("VIBE_DB_USERNAME"),
                var("VIBE_DB_PASSWORD"),
            ],
        )?
        .map(|[url, username, password]| AuthDbConfig {
            url,
            username,
            password,
        });

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_issuer,
            instance_did,
            couchdb,
            s3,
            blob_bucket: var("VIBE_BLOB_BUCKET").unwrap_or_else(|| "vibe-blobs".to_string()),
            authdb,
            claim_code: var("VIBE_CLAIM_CODE"),
        })
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// All-or-nothing variable block: `Some` when every variable is set, `None`
/// when none is, `Incomplete` otherwise.
fn block<const N: usize>(
    name: &'static str,
    required: &'static str,
    vars: [Option<String>; N],
) -> Result<Option<[String; N]>, ConfigError> {
    let set = vars.iter().filter(|v| v.is_some()).count();
    if set == 0 {
        return Ok(None);
    }
    if set < N {
        return Err(ConfigError::Incomplete {
            block: name,
            required,
        });
    }
    // All Some by the count above.
    Ok(Some(vars.map(|v| v.unwrap_or_default())))
}
