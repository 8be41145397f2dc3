//! Passphrase sealing for keyring files
//!
//! AES-256-GCM under an Argon2id-derived key. Only private key material needs
//! this; blocks themselves are public.

use crate::error::{LedgerError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use zeroize::ZeroizeOnDrop;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const SALT_LEN: usize = 32;

/// Argon2id cost parameters, stored next to the ciphertext
#[derive(Debug, Clone, Copy, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams {
            memory_kib: 65536,
            iterations: 3,
        }
    }
}

/// Key bytes that are zeroed on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureKey {
    key: Vec<u8>,
}

impl SecureKey {
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKey")
            .field("length", &self.key.len())
            .finish()
    }
}

/// Result of encryption operation
#[derive(Debug, Clone)]
pub struct EncryptionResult {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

pub struct Aes256GcmCipher {
    cipher: Aes256Gcm,
}

impl Aes256GcmCipher {
    pub fn new(key: &SecureKey) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(LedgerError::Encryption(
                "AES-256-GCM requires a 32-byte key".to_string(),
            ));
        }

        let aes_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Ok(Self {
            cipher: Aes256Gcm::new(aes_key),
        })
    }

    /// Encrypt data with a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptionResult> {
        let nonce_bytes = generate_random_bytes(NONCE_LEN);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self.cipher.encrypt(nonce, plaintext).map_err(|e| {
            LedgerError::Encryption(format!("AES-256-GCM encryption failed: {e}"))
        })?;

        Ok(EncryptionResult {
            ciphertext,
            nonce: nonce_bytes,
        })
    }

    pub fn decrypt(&self, ciphertext: &[u8], nonce_bytes: &[u8]) -> Result<Vec<u8>> {
        if nonce_bytes.len() != NONCE_LEN {
            return Err(LedgerError::Encryption(
                "AES-256-GCM requires a 12-byte nonce".to_string(),
            ));
        }

        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher.decrypt(nonce, ciphertext).map_err(|_| {
            LedgerError::Encryption("decryption failed (wrong passphrase or corrupted file)".to_string())
        })
    }
}

/// Cryptographically secure random bytes
pub fn generate_random_bytes(length: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub fn derive_key(passphrase: &str, salt: &[u8], params: KdfParams) -> Result<SecureKey> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let argon_params = Params::new(params.memory_kib, params.iterations, 1, Some(KEY_LEN))
        .map_err(|e| LedgerError::Encryption(format!("Invalid Argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = vec![0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| LedgerError::Encryption(format!("Key derivation failed: {e}")))?;

    Ok(SecureKey::new(key))
}
