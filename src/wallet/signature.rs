//! Signing and verification of payload records
//!
//! Verification never fails with an error: every outcome, including
//! undecodable or wrongly sized input, is a [`Verification`] value.

use crate::core::Payload;
use crate::error::{LedgerError, Result};
use crate::wallet::KeyPair;
use data_encoding::HEXLOWER;
use serde::Serialize;
use std::fmt;

/// Uncompressed SEC1 point: 0x04 || X || Y
pub const PUBLIC_KEY_LEN: usize = 65;
/// Fixed-width r || s
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verification {
    Valid,
    Invalid,
    /// The signature or key could not even be interpreted
    MalformedInput,
}

impl Verification {
    pub fn is_valid(self) -> bool {
        self == Verification::Valid
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Valid => write!(f, "valid"),
            Verification::Invalid => write!(f, "invalid"),
            Verification::MalformedInput => write!(f, "malformed"),
        }
    }
}

pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> Verification {
    if public_key.len() != PUBLIC_KEY_LEN || public_key[0] != 0x04 {
        return Verification::MalformedInput;
    }
    if signature.len() != SIGNATURE_LEN {
        return Verification::MalformedInput;
    }
    if crate::utils::ecdsa_p256_sha256_sign_verify(public_key, signature, message) {
        Verification::Valid
    } else {
        Verification::Invalid
    }
}

/// Same as [`verify`] with hex-encoded signature and key
pub fn verify_hex(message: &[u8], signature_hex: &str, public_key_hex: &str) -> Verification {
    let signature = HEXLOWER.decode(signature_hex.to_ascii_lowercase().as_bytes());
    let public_key = HEXLOWER.decode(public_key_hex.to_ascii_lowercase().as_bytes());
    match (signature, public_key) {
        (Ok(signature), Ok(public_key)) => verify(message, &signature, &public_key),
        _ => Verification::MalformedInput,
    }
}

/// Signs the payload's signing message and stores the hex signature and
/// public key on the payload.
pub fn sign_payload(key: &KeyPair, mut payload: Payload) -> Result<Payload> {
    if let Some(field) = payload.ambiguous_field() {
        return Err(LedgerError::Encoding(format!(
            "field '{field}' contains a signing separator ('|', or '=' in a record key)"
        )));
    }
    let message = payload.signing_message().ok_or_else(|| {
        LedgerError::Crypto(format!("{} records cannot be signed", payload.kind()))
    })?;
    let signature = key.sign(message.as_bytes())?;
    payload.attach_signature(HEXLOWER.encode(&signature), key.public_key_hex());
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, Reservation, Transfer};

    fn transfer() -> Payload {
        Payload::Transfer(Transfer {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 10,
            ..Default::default()
        })
    }

    #[test]
    fn test_sign_and_verify_with_matching_key() {
        let key = KeyPair::generate().unwrap();
        let signature = key.sign(b"alice|bob|10").unwrap();
        assert_eq!(
            verify(b"alice|bob|10", &signature, key.get_public_key()),
            Verification::Valid
        );
    }

    #[test]
    fn test_mismatched_key_and_altered_message_are_invalid() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        let signature = a.sign(b"alice|bob|10").unwrap();

        assert_eq!(
            verify(b"alice|bob|10", &signature, b.get_public_key()),
            Verification::Invalid
        );
        assert_eq!(
            verify(b"alice|bob|11", &signature, a.get_public_key()),
            Verification::Invalid
        );
    }

    #[test]
    fn test_malformed_inputs_never_panic() {
        let key = KeyPair::generate().unwrap();
        let signature = key.sign(b"m").unwrap();

        assert_eq!(verify(b"m", &[], key.get_public_key()), Verification::MalformedInput);
        assert_eq!(
            verify(b"m", &signature[..10], key.get_public_key()),
            Verification::MalformedInput
        );
        assert_eq!(verify(b"m", &signature, &[4u8; 3]), Verification::MalformedInput);
        assert_eq!(verify(b"m", &signature, &[7u8; 65]), Verification::MalformedInput);
        // Right shape, not a point on the curve
        assert_eq!(verify(b"m", &signature, &[4u8; 65]), Verification::Invalid);
        assert_eq!(verify(b"m", &[0u8; 64], key.get_public_key()), Verification::Invalid);

        assert_eq!(verify_hex(b"m", "zz", "04"), Verification::MalformedInput);
        assert_eq!(verify_hex(b"m", "abc", &key.public_key_hex()), Verification::MalformedInput);
    }

    #[test]
    fn test_verify_hex_accepts_uppercase() {
        let key = KeyPair::generate().unwrap();
        let signature = HEXLOWER.encode(&key.sign(b"m").unwrap()).to_uppercase();
        assert!(verify_hex(b"m", &signature, &key.public_key_hex()).is_valid());
    }

    #[test]
    fn test_sign_payload_round_trip() {
        let key = KeyPair::generate().unwrap();
        let signed = sign_payload(&key, transfer()).unwrap();
        assert_eq!(signed.public_key(), Some(key.public_key_hex().as_str()));
        assert_eq!(signed.signature_status(), Some(Verification::Valid));
    }

    #[test]
    fn test_edited_signed_payload_fails_verification() {
        let key = KeyPair::generate().unwrap();
        let mut signed = sign_payload(&key, transfer()).unwrap();
        if let Payload::Transfer(t) = &mut signed {
            t.amount = 1_000;
        }
        assert_eq!(signed.signature_status(), Some(Verification::Invalid));
    }

    #[test]
    fn test_signature_with_foreign_key_is_invalid() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        let mut signed = sign_payload(&a, Payload::Reservation(Reservation::default())).unwrap();
        let signature = signed.signature().unwrap().to_string();
        signed.attach_signature(signature, b.public_key_hex());
        assert_eq!(signed.signature_status(), Some(Verification::Invalid));
    }

    #[test]
    fn test_signature_cannot_be_moved_between_records() {
        let key = KeyPair::generate().unwrap();
        let signed = sign_payload(&key, Payload::Record(Record::from_pairs([("a", "1"), ("b", "2")])))
            .unwrap();

        let mut forged = Payload::Record(Record::from_pairs([("a", "1|b=2")]));
        forged.attach_signature(
            signed.signature().unwrap().to_string(),
            signed.public_key().unwrap().to_string(),
        );
        assert_ne!(forged.signature_status(), Some(Verification::Valid));

        assert!(matches!(
            sign_payload(&key, Payload::Record(Record::from_pairs([("a", "1|b=2")]))),
            Err(LedgerError::Encoding(_))
        ));
    }

    #[test]
    fn test_genesis_cannot_be_signed() {
        let key = KeyPair::generate().unwrap();
        assert!(matches!(
            sign_payload(&key, Payload::genesis()),
            Err(LedgerError::Crypto(_))
        ));
    }
}
