//! `vibe-identity` — cryptographic identity for the personal cloud.
//!
//! Every owner is an Ed25519 keypair; the public key is rendered as a
//! `did:vibe:` identifier (multicodec tag + base58btc multibase). This crate
//! owns key generation, signing/verification, and the DID codec. It performs
//! no I/O.

pub mod did;
pub mod error;
pub mod keys;

pub use did::{decode_did, encode_did};
pub use error::IdentityError;
pub use keys::{generate_keypair, sign, verify, Keypair, PUBLIC_KEY_LEN, SIGNATURE_LEN};
