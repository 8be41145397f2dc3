//! Core ledger functionality
//!
//! Blocks and their payloads, the canonical encoding they are hashed over,
//! proof-of-work sealing, chain validation, and the chain manager that ties
//! them together.

pub mod audit;
pub mod block;
pub mod blockchain;
pub mod encoding;
pub mod payload;
pub mod proof_of_work;
pub mod validator;

pub use audit::{AuditedBlock, LedgerView};
pub use block::{Block, BlockTemplate, GENESIS_PREVIOUS_HASH};
pub use blockchain::{Blockchain, LedgerOptions};
pub use encoding::{canonical_bytes, check_payload, compute_hash, DEFAULT_MAX_PAYLOAD_BYTES};
pub use payload::{Payload, Record, Reservation, Transfer, GENESIS_MESSAGE};
pub use proof_of_work::{CancelFlag, MiningLimits, ProofOfWork, MAX_DIFFICULTY};
pub use validator::{validate, ValidationReport, Violation};
