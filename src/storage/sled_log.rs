// Append-only block log on top of Sled. Keys are big-endian block indexes, so
// the tree iterates in chain order; values are bincode-encoded blocks. An
// append writes exactly one new key and never rewrites existing ones.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::storage::ChainStore;
use crate::utils::{deserialize, serialize};
use log::{debug, warn};
use sled::{Db, Tree};
use std::path::{Path, PathBuf};

const BLOCKS_TREE: &str = "blocks";

pub struct SledStore {
    db: Db,
    blocks: Tree,
    db_path: PathBuf,
}

impl SledStore {
    pub fn open(db_path: &Path) -> Result<SledStore> {
        let db = sled::open(db_path)
            .map_err(|e| LedgerError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(SledStore {
            db,
            blocks,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    fn next_index(&self) -> Result<u64> {
        let last = self
            .blocks
            .last()
            .map_err(|e| LedgerError::Persistence(format!("Failed to read tip: {e}")))?;
        match last {
            None => Ok(0),
            Some((key, _)) => Ok(decode_key(&key)? + 1),
        }
    }
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| LedgerError::CorruptStore {
        index: None,
        reason: format!("block key of {} bytes", key.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

impl ChainStore for SledStore {
    fn load(&self) -> Result<Vec<Block>> {
        let mut chain = Vec::new();
        for (position, entry) in self.blocks.iter().enumerate() {
            let (key, value) =
                entry.map_err(|e| LedgerError::Database(format!("Failed to read block: {e}")))?;
            let index = decode_key(&key)?;
            if index != position as u64 {
                return Err(LedgerError::CorruptStore {
                    index: Some(position as u64),
                    reason: format!("gap in block log: found block {index}"),
                });
            }
            let block: Block = deserialize(&value).map_err(|e| LedgerError::CorruptStore {
                index: Some(index),
                reason: format!("undecodable block: {e}"),
            })?;
            chain.push(block);
        }
        Ok(chain)
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        let expected = self.next_index()?;
        if block.get_index() != expected {
            return Err(LedgerError::Persistence(format!(
                "block {} does not follow stored tip (next index {expected})",
                block.get_index()
            )));
        }

        let key = block.get_index().to_be_bytes();
        let value = serialize(block)?;
        self.blocks
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))
            .map_err(|e| LedgerError::Persistence(format!("Failed to write block: {e}")))?
            .map_err(|_| {
                LedgerError::Persistence(format!("block {} already stored", block.get_index()))
            })?;

        if let Err(e) = self.db.flush() {
            // Not durable; take it back out so the log matches memory.
            if let Err(remove_err) = self.blocks.remove(key) {
                warn!("Could not roll back unflushed block {expected}: {remove_err}");
            }
            return Err(LedgerError::Persistence(format!(
                "Failed to flush block {expected}: {e}"
            )));
        }
        debug!("Appended block {expected} to {}", self.db_path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sled log {}", self.db_path.display())
    }
}
