use crate::core::encoding::{self, NonceTemplate};
use crate::core::Payload;
use crate::error::Result;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A sealed ledger entry. Only the chain manager creates these, and nothing
/// mutates them once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    index: u64,
    timestamp: i64,
    data: Payload,
    previous_hash: String,
    hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<u64>,
}

/// A block that has every field except its hash (and nonce, when mined)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    index: u64,
    timestamp: i64,
    data: Payload,
    previous_hash: String,
}

impl BlockTemplate {
    pub fn new(index: u64, previous_hash: String, data: Payload) -> Result<BlockTemplate> {
        Ok(Self::with_timestamp(
            index,
            current_timestamp()?,
            previous_hash,
            data,
        ))
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: i64,
        previous_hash: String,
        data: Payload,
    ) -> BlockTemplate {
        BlockTemplate {
            index,
            timestamp,
            data,
            previous_hash,
        }
    }

    pub fn genesis() -> Result<BlockTemplate> {
        Self::new(0, GENESIS_PREVIOUS_HASH.to_string(), Payload::genesis())
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_data(&self) -> &Payload {
        &self.data
    }

    pub fn canonical_bytes(&self, nonce: Option<u64>) -> Result<Vec<u8>> {
        encoding::canonical_bytes(
            self.index,
            self.timestamp,
            &self.data,
            &self.previous_hash,
            nonce,
        )
    }

    pub fn compute_hash(&self, nonce: Option<u64>) -> Result<String> {
        Ok(encoding::hash_hex(&self.canonical_bytes(nonce)?))
    }

    pub fn nonce_template(&self) -> Result<NonceTemplate> {
        NonceTemplate::new(self.index, self.timestamp, &self.data, &self.previous_hash)
    }

    /// Seals without proof-of-work
    pub fn seal(self) -> Result<Block> {
        let hash = self.compute_hash(None)?;
        Ok(self.into_block(hash, None))
    }

    pub(crate) fn into_block(self, hash: String, nonce: Option<u64>) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            data: self.data,
            previous_hash: self.previous_hash,
            hash,
            nonce,
        }
    }
}

impl Block {
    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_data(&self) -> &Payload {
        &self.data
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_nonce(&self) -> Option<u64> {
        self.nonce
    }

    /// Hash re-derived from the stored fields, ignoring the stored hash
    pub fn recompute_hash(&self) -> Result<String> {
        encoding::compute_hash(
            self.index,
            self.timestamp,
            &self.data,
            &self.previous_hash,
            self.nonce,
        )
    }

    pub fn has_valid_hash(&self) -> bool {
        matches!(self.recompute_hash(), Ok(hash) if hash == self.hash)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH && self.data.is_genesis()
    }

    #[cfg(test)]
    pub(crate) fn data_mut(&mut self) -> &mut Payload {
        &mut self.data
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }

    #[cfg(test)]
    pub(crate) fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: &str) {
        self.hash = hash.to_string();
    }
}
