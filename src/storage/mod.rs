//! Durable chain storage
//!
//! The chain manager talks to storage only through [`ChainStore`]. Three
//! backends are provided:
//! - [`SledStore`]: append-only log keyed by block index
//! - [`JsonFileStore`]: one JSON array rewritten on every append
//! - [`MemoryStore`]: no durability, for tests and throwaway ledgers

pub mod json_file;
pub mod memory;
pub mod sled_log;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sled_log::SledStore;

use crate::core::Block;
use crate::error::Result;

pub trait ChainStore: Send {
    /// Every persisted block in index order; empty when nothing was written yet
    fn load(&self) -> Result<Vec<Block>>;

    /// Durably records `block` after the current tip. On error nothing may be
    /// left half-written.
    fn append(&mut self, block: &Block) -> Result<()>;

    /// Short description for logs
    fn describe(&self) -> String;
}

impl<S: ChainStore + ?Sized> ChainStore for Box<S> {
    fn load(&self) -> Result<Vec<Block>> {
        (**self).load()
    }

    fn append(&mut self, block: &Block) -> Result<()> {
        (**self).append(block)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
