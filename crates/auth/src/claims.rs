use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vibe_core::Did;

/// JWT claims model.
///
/// `identityDid` is the subject: the owner identity the token was minted
/// for. Expiry is wall-clock (`exp`), checked by comparison during decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    pub identity_did: Did,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// HS256 bearer-token codec bound to the instance secret and issuer.
#[derive(Clone)]
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    /// Mint a token for `did`, valid for `ttl`.
    pub fn mint(&self, did: &Did, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = JwtClaims {
            identity_did: did.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verify signature, issuer, and expiry; return the claims.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        decode::<JwtClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did() -> Did {
        Did::from_encoded("did:vibe:ztest".to_string())
    }

    #[test]
    fn mint_verify_roundtrip() {
        let codec = Hs256TokenCodec::new(b"secret", "vibe-cloud");
        let token = codec.mint(&did(), Duration::minutes(10)).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.identity_did, did());
        assert_eq!(claims.iss, "vibe-cloud");
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let codec = Hs256TokenCodec::new(b"secret", "vibe-cloud");
        let other = Hs256TokenCodec::new(b"other", "vibe-cloud");
        let token = codec.mint(&did(), Duration::minutes(10)).unwrap();
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let codec = Hs256TokenCodec::new(b"secret", "vibe-cloud");
        // jsonwebtoken applies default leeway; go well past it.
        let token = codec.mint(&did(), Duration::seconds(-120)).unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let minter = Hs256TokenCodec::new(b"secret", "someone-else");
        let codec = Hs256TokenCodec::new(b"secret", "vibe-cloud");
        let token = minter.mint(&did(), Duration::minutes(10)).unwrap();
        assert!(matches!(codec.verify(&token), Err(TokenError::Invalid(_))));
    }
}
