//! Ledger view for readers and audit tooling
//!
//! Chain integrity and signature validity are reported side by side and never
//! folded into one another: a block may sit correctly in the chain with a bad
//! signature, or carry a good signature inside a tampered chain.

use crate::core::validator::{validate, ValidationReport};
use crate::core::Block;
use crate::wallet::Verification;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditedBlock {
    #[serde(flatten)]
    pub block: Block,
    /// `None` when the payload carries no signature at all
    pub signature_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl AuditedBlock {
    pub fn from_block(block: Block) -> AuditedBlock {
        let verification = block.get_data().signature_status();
        AuditedBlock {
            block,
            signature_valid: verification.map(Verification::is_valid),
            verification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    pub validation: ValidationReport,
    pub blocks: Vec<AuditedBlock>,
}

impl LedgerView {
    pub fn build(chain: Vec<Block>) -> LedgerView {
        let validation = validate(&chain);
        let blocks = chain.into_iter().map(AuditedBlock::from_block).collect();
        LedgerView { validation, blocks }
    }

    /// Indexes of blocks whose signature is present but does not verify
    pub fn bad_signatures(&self) -> Vec<u64> {
        self.blocks
            .iter()
            .filter(|b| b.signature_valid == Some(false))
            .map(|b| b.block.get_index())
            .collect()
    }
}
