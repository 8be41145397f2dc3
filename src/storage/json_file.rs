// Whole-file JSON persistence: the file always holds the complete chain as an
// ordered array of {index, timestamp, data, previous_hash, hash, nonce?}.
// Every append reads, extends and rewrites the file, so appends cost O(chain
// length). Fine for small ledgers; use SledStore for anything that grows.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::storage::ChainStore;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CHAIN_FILE: &str = "chain.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> JsonFileStore {
        JsonFileStore {
            path: path.to_path_buf(),
        }
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, blocks: &[Block]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, blocks)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        // rename is atomic, so readers see either the old or the new chain
        fs::rename(&tmp_path, &self.path)
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Block>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read(&self.path)?;
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&contents).map_err(|e| LedgerError::CorruptStore {
            index: None,
            reason: format!("{} is not a valid chain file: {e}", self.path.display()),
        })
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        let mut blocks = self
            .load()
            .map_err(|e| LedgerError::Persistence(format!("cannot re-read chain file: {e}")))?;
        if block.get_index() != blocks.len() as u64 {
            return Err(LedgerError::Persistence(format!(
                "block {} does not follow stored tip (stored length {})",
                block.get_index(),
                blocks.len()
            )));
        }
        blocks.push(block.clone());

        self.write_all(&blocks).map_err(|e| {
            LedgerError::Persistence(format!("failed to write {}: {e}", self.path.display()))
        })?;
        debug!("Rewrote {} with {} blocks", self.path.display(), blocks.len());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockTemplate, Payload, Record};
    use tempfile::tempdir;

    fn genesis() -> Block {
        BlockTemplate::genesis().unwrap().seal().unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(&dir.path().join(CHAIN_FILE));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_then_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CHAIN_FILE);
        let mut store = JsonFileStore::new(&path);

        let genesis = genesis();
        store.append(&genesis).unwrap();
        let next = BlockTemplate::new(
            1,
            genesis.get_hash().to_string(),
            Payload::Record(Record::from_pairs([("msg", "hello")])),
        )
        .unwrap()
        .seal()
        .unwrap();
        store.append(&next).unwrap();

        let reloaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(reloaded, vec![genesis, next]);

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[1]["data"]["fields"]["msg"], "hello");
        assert_eq!(raw[0]["previous_hash"], "0");
    }

    #[test]
    fn test_out_of_order_append_rejected() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::new(&dir.path().join(CHAIN_FILE));
        let stray = BlockTemplate::new(5, "ab".to_string(), Payload::genesis())
            .unwrap()
            .seal()
            .unwrap();
        assert!(matches!(
            store.append(&stray),
            Err(LedgerError::Persistence(_))
        ));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CHAIN_FILE);
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(LedgerError::CorruptStore { .. })
        ));
    }
}
