use crate::error::{LedgerError, Result};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair as _, ECDSA_P256_SHA256_FIXED_SIGNING};
use data_encoding::HEXLOWER;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION: u8 = 0x00;
pub const FINGERPRINT_CHECK_SUM_LEN: usize = 4;

/// An ECDSA P-256 key pair held by a payload producer.
///
/// The private half is kept as PKCS#8 bytes and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, bincode::Encode, bincode::Decode)]
pub struct KeyPair {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let pkcs8 = crate::utils::new_key_pair()?;
        Self::from_pkcs8(pkcs8)
    }

    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<KeyPair> {
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(KeyPair { pkcs8, public_key })
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        crate::utils::ecdsa_p256_sha256_sign_digest(&self.pkcs8, message)
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn public_key_hex(&self) -> String {
        HEXLOWER.encode(&self.public_key)
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key)
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = crate::utils::sha256_digest(pub_key);
    crate::utils::ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = crate::utils::sha256_digest(payload);
    let second_sha = crate::utils::sha256_digest(first_sha.as_slice());
    second_sha[0..FINGERPRINT_CHECK_SUM_LEN].to_vec()
}

/// Base58Check identifier for a public key: version + RIPEMD160(SHA256(key)) + checksum
pub fn fingerprint(public_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(hash_pub_key(public_key));
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    crate::utils::base58_encode(payload.as_slice())
}

pub fn validate_fingerprint(fingerprint: &str) -> bool {
    let payload = match crate::utils::base58_decode(fingerprint) {
        Ok(payload) => payload,
        Err(_) => return false,
    };

    if payload.len() < FINGERPRINT_CHECK_SUM_LEN + 1 {
        return false;
    }

    let (body, actual_checksum) = payload.split_at(payload.len() - FINGERPRINT_CHECK_SUM_LEN);
    checksum(body) == actual_checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(a.get_public_key(), b.get_public_key());
        assert_eq!(a.get_public_key().len(), 65);
        assert_eq!(a.public_key_hex().len(), 130);
    }

    #[test]
    fn test_signature_is_fixed_width() {
        let key = KeyPair::generate().unwrap();
        assert_eq!(key.sign(b"alice|bob|10").unwrap().len(), 64);
    }

    #[test]
    fn test_fingerprint_checksum() {
        let key = KeyPair::generate().unwrap();
        let fp = key.fingerprint();
        assert!(validate_fingerprint(&fp));
        assert!(!validate_fingerprint("1111"));
        assert!(!validate_fingerprint("not base58 0OIl"));
    }

    #[test]
    fn test_from_pkcs8_rejects_garbage() {
        assert!(KeyPair::from_pkcs8(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key = KeyPair::generate().unwrap();
        let shown = format!("{key:?}");
        assert!(shown.contains("fingerprint"));
        assert!(!shown.contains("pkcs8"));
    }
}
