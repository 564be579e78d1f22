//! DID codec: 32-byte Ed25519 public key ↔ `did:vibe:z…` string.
//!
//! Wire form is the did:key convention with a different method name:
//! varint(0xed) multicodec tag ∥ raw public key, base58btc multibase
//! (leading `z`), prefixed `did:vibe:`.

use vibe_core::id::DID_PREFIX;
use vibe_core::Did;

use crate::error::IdentityError;
use crate::keys::PUBLIC_KEY_LEN;

/// Multicodec code for an Ed25519 public key.
const ED25519_PUB_CODEC: u64 = 0xed;

/// Encode a public key as a `did:vibe:` identifier.
pub fn encode_did(public_key: &[u8; PUBLIC_KEY_LEN]) -> Did {
    let mut bytes = Vec::with_capacity(2 + PUBLIC_KEY_LEN);
    write_varint(ED25519_PUB_CODEC, &mut bytes);
    bytes.extend_from_slice(public_key);
    Did::from_encoded(format!(
        "{DID_PREFIX}z{}",
        bs58::encode(bytes).into_string()
    ))
}

/// Decode a `did:vibe:` identifier back to the raw public key.
pub fn decode_did(did: &Did) -> Result<[u8; PUBLIC_KEY_LEN], IdentityError> {
    let s = did.as_str();
    let body = s
        .strip_prefix(DID_PREFIX)
        .ok_or_else(|| IdentityError::format(format!("missing '{DID_PREFIX}' prefix")))?;
    let b58 = body
        .strip_prefix('z')
        .ok_or_else(|| IdentityError::format("not base58btc multibase ('z' prefix)"))?;

    let bytes = bs58::decode(b58)
        .into_vec()
        .map_err(|e| IdentityError::format(format!("invalid base58: {e}")))?;

    let (codec, rest) = read_varint(&bytes)
        .ok_or_else(|| IdentityError::format("truncated multicodec varint"))?;
    if codec != ED25519_PUB_CODEC {
        return Err(IdentityError::format(format!(
            "unsupported key codec 0x{codec:x} (expected 0x{ED25519_PUB_CODEC:x})"
        )));
    }

    rest.try_into()
        .map_err(|_| IdentityError::format(format!("expected 32 key bytes, got {}", rest.len())))
}

/// LEB128 unsigned varint append.
fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// LEB128 unsigned varint read; returns the value and remaining bytes.
fn read_varint(bytes: &[u8]) -> Option<(u64, &[u8])> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if i >= 9 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, &bytes[i + 1..]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encoded_dids_carry_the_expected_prefix() {
        let kp = crate::generate_keypair();
        let did = encode_did(kp.public_bytes());
        assert!(did.as_str().starts_with("did:vibe:z"));
    }

    #[test]
    fn varint_tag_is_two_bytes_ed_01() {
        let mut out = Vec::new();
        write_varint(ED25519_PUB_CODEC, &mut out);
        assert_eq!(out, vec![0xed, 0x01]);
    }

    #[test]
    fn decode_rejects_foreign_method() {
        let did = Did::from_encoded("did:web:example.com".to_string());
        assert!(matches!(decode_did(&did), Err(IdentityError::Format(_))));
    }

    #[test]
    fn decode_rejects_wrong_codec() {
        // Valid multibase carrying a secp256k1 tag (0xe7) instead of 0xed.
        let mut bytes = Vec::new();
        write_varint(0xe7, &mut bytes);
        bytes.extend_from_slice(&[7u8; 32]);
        let did = Did::from_encoded(format!(
            "did:vibe:z{}",
            bs58::encode(bytes).into_string()
        ));
        let err = decode_did(&did).unwrap_err();
        assert!(matches!(err, IdentityError::Format(_)));
    }

    #[test]
    fn decode_rejects_truncated_key() {
        let mut bytes = Vec::new();
        write_varint(ED25519_PUB_CODEC, &mut bytes);
        bytes.extend_from_slice(&[7u8; 16]);
        let did = Did::from_encoded(format!(
            "did:vibe:z{}",
            bs58::encode(bytes).into_string()
        ));
        assert!(decode_did(&did).is_err());
    }

    proptest! {
        #[test]
        fn roundtrip_any_key_bytes(pk in prop::array::uniform32(any::<u8>())) {
            // The codec is byte-level: any 32 bytes must survive the round trip,
            // whether or not they are a valid curve point.
            let did = encode_did(&pk);
            prop_assert_eq!(decode_did(&did).unwrap(), pk);
        }
    }
}
