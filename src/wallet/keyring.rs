use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::sealing::{
    derive_key, generate_random_bytes, Aes256GcmCipher, KdfParams, SecureKey, SALT_LEN,
};
use crate::wallet::KeyPair;
use log::info;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const KEYRING_FILE: &str = "keyring.dat";
pub const MIN_PASSPHRASE_LEN: usize = 8;

#[derive(bincode::Encode, bincode::Decode)]
struct SealedKeys {
    salt: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    kdf: KdfParams,
}

#[derive(bincode::Encode, bincode::Decode)]
enum KeyringFile {
    Plain(BTreeMap<String, KeyPair>),
    Sealed(SealedKeys),
}

struct Seal {
    key: SecureKey,
    salt: Vec<u8>,
    kdf: KdfParams,
}

/// Named signing keys kept in one file, optionally sealed with a passphrase
pub struct Keyring {
    path: PathBuf,
    keys: BTreeMap<String, KeyPair>,
    seal: Option<Seal>,
}

impl Keyring {
    pub fn open(path: &Path, passphrase: Option<&str>) -> Result<Keyring> {
        Self::open_with_params(path, passphrase, KdfParams::default())
    }

    /// `kdf` only applies when a new seal is created; existing files keep
    /// the parameters they were written with.
    pub fn open_with_params(
        path: &Path,
        passphrase: Option<&str>,
        kdf: KdfParams,
    ) -> Result<Keyring> {
        if let Some(passphrase) = passphrase {
            if passphrase.len() < MIN_PASSPHRASE_LEN {
                return Err(LedgerError::Keyring(format!(
                    "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters long"
                )));
            }
        }

        let mut keyring = Keyring {
            path: path.to_path_buf(),
            keys: BTreeMap::new(),
            seal: None,
        };

        if !path.exists() {
            if let Some(passphrase) = passphrase {
                let salt = generate_random_bytes(SALT_LEN);
                let key = derive_key(passphrase, &salt, kdf)?;
                keyring.seal = Some(Seal { key, salt, kdf });
            }
            return Ok(keyring);
        }

        let mut file = File::open(path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        let stored: KeyringFile = deserialize(&buf)
            .map_err(|e| LedgerError::Keyring(format!("Unreadable keyring file: {e}")))?;

        match (stored, passphrase) {
            (KeyringFile::Plain(keys), None) => keyring.keys = keys,
            (KeyringFile::Plain(keys), Some(passphrase)) => {
                // Sealed from the next save onwards
                let salt = generate_random_bytes(SALT_LEN);
                let key = derive_key(passphrase, &salt, kdf)?;
                keyring.keys = keys;
                keyring.seal = Some(Seal { key, salt, kdf });
            }
            (KeyringFile::Sealed(_), None) => {
                return Err(LedgerError::Keyring(
                    "Keyring is sealed; a passphrase is required".to_string(),
                ));
            }
            (KeyringFile::Sealed(sealed), Some(passphrase)) => {
                let key = derive_key(passphrase, &sealed.salt, sealed.kdf)?;
                let cipher = Aes256GcmCipher::new(&key)?;
                let plaintext = Zeroizing::new(cipher.decrypt(&sealed.ciphertext, &sealed.nonce)?);
                keyring.keys = deserialize(&plaintext)
                    .map_err(|e| LedgerError::Keyring(format!("Unreadable key data: {e}")))?;
                keyring.seal = Some(Seal {
                    key,
                    salt: sealed.salt,
                    kdf: sealed.kdf,
                });
            }
        }

        info!(
            "Loaded keyring {} with {} keys",
            keyring.path.display(),
            keyring.keys.len()
        );
        Ok(keyring)
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.is_some()
    }

    /// Generates and stores a new key; returns its fingerprint
    pub fn create_key(&mut self, name: &str) -> Result<String> {
        let key = KeyPair::generate()?;
        let fingerprint = key.fingerprint();
        self.insert(name, key)?;
        self.save()?;
        Ok(fingerprint)
    }

    pub fn insert(&mut self, name: &str, key: KeyPair) -> Result<()> {
        if name.is_empty() {
            return Err(LedgerError::Keyring("Key name must not be empty".to_string()));
        }
        if self.keys.contains_key(name) {
            return Err(LedgerError::Keyring(format!("Key '{name}' already exists")));
        }
        self.keys.insert(name.to_string(), key);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&KeyPair> {
        self.keys.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&KeyPair> {
        self.get(name)
            .ok_or_else(|| LedgerError::Keyring(format!("No key named '{name}'")))
    }

    pub fn names(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    pub fn save(&self) -> Result<()> {
        let stored = match &self.seal {
            None => KeyringFile::Plain(self.keys.clone()),
            Some(seal) => {
                let plaintext = Zeroizing::new(serialize(&self.keys)?);
                let sealed = Aes256GcmCipher::new(&seal.key)?.encrypt(&plaintext)?;
                KeyringFile::Sealed(SealedKeys {
                    salt: seal.salt.clone(),
                    nonce: sealed.nonce,
                    ciphertext: sealed.ciphertext,
                    kdf: seal.kdf,
                })
            }
        };
        let bytes = serialize(&stored)?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
