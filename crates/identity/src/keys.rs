//! Ed25519 key generation, signing, and verification.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::IdentityError;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// An Ed25519 keypair. The secret half never leaves this process; callers
/// that need to persist it go through `secret_bytes()` deliberately.
#[derive(Clone)]
pub struct Keypair {
    public: [u8; PUBLIC_KEY_LEN],
    secret: [u8; PRIVATE_KEY_LEN],
}

impl Keypair {
    pub fn public_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public
    }

    pub fn secret_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.secret
    }
}

impl core::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never leak secret material through Debug.
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Generate a fresh keypair from the OS CSPRNG.
pub fn generate_keypair() -> Keypair {
    let signing = SigningKey::generate(&mut OsRng);
    Keypair {
        public: signing.verifying_key().to_bytes(),
        secret: signing.to_bytes(),
    }
}

/// Sign `message` with a 32-byte private key.
///
/// Errors if the key is not exactly 32 bytes.
pub fn sign(message: &[u8], private_key: &[u8]) -> Result<[u8; SIGNATURE_LEN], IdentityError> {
    let secret: &[u8; PRIVATE_KEY_LEN] =
        private_key
            .try_into()
            .map_err(|_| IdentityError::InvalidKeyLength {
                expected: PRIVATE_KEY_LEN,
                got: private_key.len(),
            })?;
    let signing = SigningKey::from_bytes(secret);
    Ok(signing.sign(message).to_bytes())
}

/// Verify `signature` over `message` with a 32-byte public key.
///
/// Fails closed: malformed signature bytes and 32-byte keys that are not
/// valid curve points both yield `Ok(false)`, never an error. Only a
/// wrong-length public key (the caller's input) is an `Err`.
pub fn verify(signature: &[u8], message: &[u8], public_key: &[u8]) -> Result<bool, IdentityError> {
    let public: &[u8; PUBLIC_KEY_LEN] =
        public_key
            .try_into()
            .map_err(|_| IdentityError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                got: public_key.len(),
            })?;
    let Ok(verifying) = VerifyingKey::from_bytes(public) else {
        return Ok(false);
    };

    let Ok(sig) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(verifying.verify(message, &sig).is_ok())
}
