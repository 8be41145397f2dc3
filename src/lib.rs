//! # Ledger Chain
//!
//! An append-only, hash-chained ledger for records submitted by independent
//! producers. Each block commits to its predecessor's hash and to a canonical
//! encoding of its own content, so any later edit or reordering is detected.
//!
//! ## Layout
//! - `core/`: blocks, payloads, canonical encoding, proof-of-work, validation,
//!   and the [`Blockchain`] chain manager
//! - `wallet/`: key pairs, payload signing and verification, the sealed keyring
//! - `storage/`: the [`ChainStore`] trait with sled, JSON file and memory backends
//! - `config/`: defaults, `ledger.toml` and `LEDGER_*` environment overrides
//! - `utils/`: digests, key primitives and bincode helpers
//! - `cli/`: command-line interface definitions
//!
//! ## Usage
//! ```no_run
//! use ledger_chain::{Blockchain, LedgerOptions, MemoryStore, Payload, Record};
//!
//! let ledger = Blockchain::initialize(MemoryStore::new(), LedgerOptions::default())?;
//! ledger.append(Payload::Record(Record::from_pairs([("msg", "hello")])))?;
//! assert!(ledger.validate().valid);
//! # Ok::<(), ledger_chain::LedgerError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, StoreKind, GLOBAL_CONFIG};
pub use core::{
    validate, AuditedBlock, Block, BlockTemplate, Blockchain, CancelFlag, LedgerOptions,
    LedgerView, MiningLimits, Payload, ProofOfWork, Record, Reservation, Transfer,
    ValidationReport, Violation,
};
pub use error::{LedgerError, MiningError, Result};
pub use storage::{ChainStore, JsonFileStore, MemoryStore, SledStore};
pub use utils::{
    base58_decode, base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    fingerprint, sign_payload, validate_fingerprint, verify, verify_hex, KeyPair, Keyring,
    Verification,
};
