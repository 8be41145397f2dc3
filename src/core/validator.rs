//! Chain validation
//!
//! Re-derives linkage and content integrity over a whole chain and reports the
//! first failure as data. Validation never returns an error.

use crate::core::block::GENESIS_PREVIOUS_HASH;
use crate::core::Block;
use serde::Serialize;
use std::fmt;

/// Which invariant a block broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// `previous_hash` does not match the predecessor's hash
    LinkageBroken,
    /// The stored hash does not match the block's recomputed hash, or the
    /// block's index does not match its position
    ContentTampered,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LinkageBroken => write!(f, "linkage broken"),
            Violation::ContentTampered => write!(f, "content tampered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub first_bad_index: Option<u64>,
    pub reason: Option<Violation>,
}

impl ValidationReport {
    pub fn ok() -> ValidationReport {
        ValidationReport {
            valid: true,
            first_bad_index: None,
            reason: None,
        }
    }

    pub fn failed(index: u64, reason: Violation) -> ValidationReport {
        ValidationReport {
            valid: false,
            first_bad_index: Some(index),
            reason: Some(reason),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_bad_index, self.reason) {
            (Some(index), Some(reason)) => write!(f, "invalid at block {index}: {reason}"),
            _ => write!(f, "valid"),
        }
    }
}

/// Content check for the block at `position`. The index is part of the hashed
/// content, so an edited index normally fails the hash; a block that hashes
/// correctly but sits at the wrong position is reported the same way.
fn check_content(position: u64, block: &Block) -> Option<ValidationReport> {
    if block.has_valid_hash() && block.get_index() == position {
        None
    } else {
        Some(ValidationReport::failed(position, Violation::ContentTampered))
    }
}

/// Fail-fast scan. For each block linkage (`previous_hash`) is checked before
/// content.
///
/// The genesis block is held to `previous_hash == "0"` and its own content
/// hash, so tampering with block 0 is caught as well.
pub fn validate(chain: &[Block]) -> ValidationReport {
    let Some(genesis) = chain.first() else {
        return ValidationReport::ok();
    };

    if genesis.get_previous_hash() != GENESIS_PREVIOUS_HASH {
        return ValidationReport::failed(0, Violation::LinkageBroken);
    }
    if let Some(report) = check_content(0, genesis) {
        return report;
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let position = position as u64 + 1;

        if current.get_previous_hash() != previous.get_hash() {
            return ValidationReport::failed(position, Violation::LinkageBroken);
        }
        if let Some(report) = check_content(position, current) {
            return report;
        }
    }

    ValidationReport::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockTemplate, Payload, Record};

    fn build_chain(len: usize) -> Vec<Block> {
        let mut chain = vec![BlockTemplate::with_timestamp(
            0,
            1,
            GENESIS_PREVIOUS_HASH.to_string(),
            Payload::genesis(),
        )
        .seal()
        .unwrap()];
        for i in 1..len {
            let tip = chain.last().unwrap().get_hash().to_string();
            let payload = Payload::Record(Record::from_pairs([("n", i.to_string())]));
            chain.push(
                BlockTemplate::with_timestamp(i as u64, 1 + i as i64, tip, payload)
                    .seal()
                    .unwrap(),
            );
        }
        chain
    }

    #[test]
    fn test_empty_and_genesis_only_are_valid() {
        assert!(validate(&[]).valid);
        assert_eq!(validate(&build_chain(1)), ValidationReport::ok());
    }

    #[test]
    fn test_intact_chain_is_valid() {
        assert!(validate(&build_chain(5)).valid);
    }

    #[test]
    fn test_content_tamper_reports_index() {
        let mut chain = build_chain(4);
        if let Payload::Record(record) = chain[2].data_mut() {
            record.fields.insert("n".to_string(), "999".to_string());
        }
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(2, Violation::ContentTampered)
        );
    }

    #[test]
    fn test_edited_index_is_content_tamper() {
        let mut chain = build_chain(3);
        chain[1].set_index(7);
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(1, Violation::ContentTampered)
        );

        let mut chain = build_chain(2);
        chain[0].set_index(3);
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(0, Violation::ContentTampered)
        );
    }

    #[test]
    fn test_rehashed_block_at_wrong_position_is_content_tamper() {
        let mut chain = build_chain(3);
        chain[2].set_index(5);
        let rehashed = chain[2].recompute_hash().unwrap();
        chain[2].set_hash(&rehashed);
        assert!(chain[2].has_valid_hash());
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(2, Violation::ContentTampered)
        );
    }

    #[test]
    fn test_genesis_tamper_is_caught() {
        let mut chain = build_chain(3);
        *chain[0].data_mut() = Payload::Genesis {
            message: "rewritten".to_string(),
        };
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(0, Violation::ContentTampered)
        );
    }

    #[test]
    fn test_relinked_block_reports_linkage_first() {
        let mut chain = build_chain(4);
        // Both linkage and content are now wrong; linkage wins.
        chain[3].set_previous_hash("abc");
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(3, Violation::LinkageBroken)
        );
    }

    #[test]
    fn test_rehashed_block_breaks_successor_linkage() {
        let mut chain = build_chain(4);
        if let Payload::Record(record) = chain[1].data_mut() {
            record.fields.insert("n".to_string(), "forged".to_string());
        }
        let forged = chain[1].recompute_hash().unwrap();
        chain[1].set_hash(&forged);
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(2, Violation::LinkageBroken)
        );
    }

    #[test]
    fn test_missing_block_breaks_linkage() {
        let mut chain = build_chain(4);
        chain.remove(2);
        assert_eq!(
            validate(&chain),
            ValidationReport::failed(2, Violation::LinkageBroken)
        );
    }

    #[test]
    fn test_report_display() {
        assert_eq!(ValidationReport::ok().to_string(), "valid");
        assert_eq!(
            ValidationReport::failed(1, Violation::ContentTampered).to_string(),
            "invalid at block 1: content tampered"
        );
    }
}
