use crate::core::Block;
use crate::error::Result;
use crate::storage::ChainStore;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blocks: Vec<Block>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Starts from an existing sequence, e.g. a snapshot taken elsewhere
    pub fn with_blocks(blocks: Vec<Block>) -> MemoryStore {
        MemoryStore { blocks }
    }
}

impl ChainStore for MemoryStore {
    fn load(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.clone())
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        self.blocks.push(block.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} blocks)", self.blocks.len())
    }
}
