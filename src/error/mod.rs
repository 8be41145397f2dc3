//! Error handling for the ledger
//!
//! Integrity findings (broken links, tampered blocks, bad signatures) are
//! reported as values by the validator and the signature subsystem. The
//! variants here cover the operations that genuinely fail.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reasons the proof-of-work search stopped without a qualifying hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    /// The attempt cap was reached
    Exhausted { attempts: u64 },
    /// The wall-clock budget ran out
    TimedOut { attempts: u64 },
    /// An operator raised the cancel flag
    Cancelled { attempts: u64 },
    /// Difficulty outside `0..=64`
    InvalidDifficulty(u32),
}

impl fmt::Display for MiningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiningError::Exhausted { attempts } => {
                write!(f, "attempt cap reached after {attempts} attempts")
            }
            MiningError::TimedOut { attempts } => {
                write!(f, "timed out after {attempts} attempts")
            }
            MiningError::Cancelled { attempts } => {
                write!(f, "cancelled after {attempts} attempts")
            }
            MiningError::InvalidDifficulty(d) => {
                write!(f, "difficulty {d} is outside the supported range 0..=64")
            }
        }
    }
}

/// Error types for ledger operations
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// Payload cannot be canonically serialized; the chain is left unchanged
    Encoding(String),
    /// A non-empty store failed the genesis or integrity checks at load time
    CorruptStore { index: Option<u64>, reason: String },
    /// Durable write failed; the in-memory chain did not advance
    Persistence(String),
    /// Proof-of-work search did not finish
    Mining(MiningError),
    /// Cryptographic operation errors
    Crypto(String),
    /// Encryption/decryption errors
    Encryption(String),
    /// Keyring lookup or storage errors
    Keyring(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Database-related errors
    Database(String),
    /// A ledger lock was poisoned by a panicking writer
    Lock(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            LedgerError::CorruptStore {
                index: Some(index),
                reason,
            } => write!(f, "Corrupt store at block {index}: {reason}"),
            LedgerError::CorruptStore {
                index: None,
                reason,
            } => write!(f, "Corrupt store: {reason}"),
            LedgerError::Persistence(msg) => write!(f, "Persistence failure: {msg}"),
            LedgerError::Mining(err) => write!(f, "Mining error: {err}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Encryption(msg) => write!(f, "Encryption error: {msg}"),
            LedgerError::Keyring(msg) => write!(f, "Keyring error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Database(msg) => write!(f, "Database error: {msg}"),
            LedgerError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<MiningError> for LedgerError {
    fn from(err: MiningError) -> Self {
        LedgerError::Mining(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_store_display_includes_index() {
        let err = LedgerError::CorruptStore {
            index: Some(3),
            reason: "content tampered".to_string(),
        };
        assert_eq!(err.to_string(), "Corrupt store at block 3: content tampered");
    }

    #[test]
    fn test_mining_error_converts() {
        let err: LedgerError = MiningError::Exhausted { attempts: 10 }.into();
        assert_eq!(
            err.to_string(),
            "Mining error: attempt cap reached after 10 attempts"
        );
    }
}
