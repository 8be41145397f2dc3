// The chain manager: owns the ordered block sequence, funnels every append
// through a single writer, and publishes each new block only after the store
// has durably accepted it.

use crate::core::audit::LedgerView;
use crate::core::encoding::{check_payload, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::core::proof_of_work::{CancelFlag, MiningLimits, MAX_DIFFICULTY};
use crate::core::validator::{validate, ValidationReport};
use crate::core::{Block, BlockTemplate, Payload, ProofOfWork};
use crate::error::{LedgerError, MiningError, Result};
use crate::storage::ChainStore;
use log::{error, info, warn};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Leading zero hex digits required of every new block hash; 0 disables mining
    pub difficulty: u32,
    pub mining_limits: MiningLimits,
    pub max_payload_bytes: usize,
    /// Re-check proof-of-work of every stored block when loading
    pub verify_work_on_load: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        LedgerOptions {
            difficulty: 0,
            mining_limits: MiningLimits::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            verify_work_on_load: false,
        }
    }
}

impl LedgerOptions {
    pub fn with_difficulty(difficulty: u32) -> LedgerOptions {
        LedgerOptions {
            difficulty,
            ..LedgerOptions::default()
        }
    }

    fn check(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(MiningError::InvalidDifficulty(self.difficulty).into());
        }
        if self.mining_limits.max_attempts == 0 {
            return Err(LedgerError::Config(
                "mining attempt cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Handle to a ledger. Clones share the same chain, so any number of threads
/// may append and read; appends are serialized internally.
#[derive(Clone)]
pub struct Blockchain {
    // Held for the whole append, mining included. Owns the store.
    writer: Arc<Mutex<Box<dyn ChainStore>>>,
    // Published blocks. Written only to push a fully built block.
    chain: Arc<RwLock<Vec<Block>>>,
    options: LedgerOptions,
    cancel: CancelFlag,
}

impl Blockchain {
    /// Loads the chain from `store`, or writes a genesis block if the store is
    /// empty. A non-empty store that fails the genesis or integrity checks is
    /// reported as `CorruptStore` and left untouched.
    pub fn initialize<S: ChainStore + 'static>(store: S, options: LedgerOptions) -> Result<Blockchain> {
        options.check()?;
        let mut store: Box<dyn ChainStore> = Box::new(store);
        let cancel = CancelFlag::new();

        let blocks = store.load()?;
        let blocks = if blocks.is_empty() {
            info!("Creating genesis block in {}", store.describe());
            let genesis = Self::seal_template(&options, &cancel, BlockTemplate::genesis()?)?;
            store.append(&genesis).map_err(into_persistence)?;
            vec![genesis]
        } else {
            Self::check_loaded(&blocks, &options)?;
            info!(
                "Loaded {} blocks from {}",
                blocks.len(),
                store.describe()
            );
            blocks
        };

        Ok(Blockchain {
            writer: Arc::new(Mutex::new(store)),
            chain: Arc::new(RwLock::new(blocks)),
            options,
            cancel,
        })
    }

    fn check_loaded(blocks: &[Block], options: &LedgerOptions) -> Result<()> {
        let corrupt = |index: u64, reason: String| {
            error!("Store failed integrity check at block {index}: {reason}");
            LedgerError::CorruptStore {
                index: Some(index),
                reason,
            }
        };

        if !blocks[0].is_genesis() {
            return Err(corrupt(0, "first stored block is not a genesis block".to_string()));
        }

        let report = validate(blocks);
        if let (Some(index), Some(reason)) = (report.first_bad_index, report.reason) {
            return Err(corrupt(index, reason.to_string()));
        }

        if options.verify_work_on_load && options.difficulty > 0 {
            if let Some(block) = blocks
                .iter()
                .find(|b| !ProofOfWork::validate(b, options.difficulty))
            {
                return Err(corrupt(
                    block.get_index(),
                    format!("proof-of-work below difficulty {}", options.difficulty),
                ));
            }
        }
        Ok(())
    }

    fn seal_template(
        options: &LedgerOptions,
        cancel: &CancelFlag,
        template: BlockTemplate,
    ) -> Result<Block> {
        if options.difficulty == 0 {
            // Nothing to cancel; drop any stale request
            cancel.reset();
            return template.seal();
        }
        ProofOfWork::new(options.difficulty, options.mining_limits)?
            .with_cancel(cancel.clone())
            .mine(template)
    }

    /// Builds, seals, persists and publishes a block holding `payload`.
    ///
    /// Nothing becomes visible to readers unless the store accepted the
    /// block, so a failed append leaves the chain exactly as it was.
    pub fn append(&self, payload: Payload) -> Result<Block> {
        if payload.is_genesis() {
            return Err(LedgerError::Encoding(
                "genesis records can only start a chain".to_string(),
            ));
        }
        check_payload(&payload, self.options.max_payload_bytes)?;

        let mut store = self
            .writer
            .lock()
            .map_err(|_| LedgerError::Lock("ledger writer lock poisoned".to_string()))?;

        let (index, previous_hash) = {
            let chain = self.chain.read().unwrap_or_else(PoisonError::into_inner);
            let tip = chain
                .last()
                .ok_or_else(|| LedgerError::Lock("chain has no genesis block".to_string()))?;
            (chain.len() as u64, tip.get_hash().to_string())
        };

        let template = BlockTemplate::new(index, previous_hash, payload)?;
        let block = match Self::seal_template(&self.options, &self.cancel, template) {
            Ok(block) => block,
            Err(e @ LedgerError::Mining(MiningError::Cancelled { .. })) => {
                self.cancel.reset();
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = store.append(&block) {
            warn!("Block {index} was not persisted, chain left at {index} blocks: {e}");
            return Err(into_persistence(e));
        }

        self.chain
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(block.clone());
        info!(
            "Appended {} block {}: {}",
            block.get_data().kind(),
            index,
            block.get_hash()
        );
        Ok(block)
    }

    /// Copy of the published chain
    pub fn get_all(&self) -> Vec<Block> {
        self.chain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, index: u64) -> Option<Block> {
        let chain = self.chain.read().unwrap_or_else(PoisonError::into_inner);
        usize::try_from(index).ok().and_then(|i| chain.get(i).cloned())
    }

    pub fn tip(&self) -> Block {
        let chain = self.chain.read().unwrap_or_else(PoisonError::into_inner);
        // initialize always leaves at least the genesis block
        chain[chain.len() - 1].clone()
    }

    pub fn len(&self) -> usize {
        self.chain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Always false once initialized
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn difficulty(&self) -> u32 {
        self.options.difficulty
    }

    pub fn get_options(&self) -> &LedgerOptions {
        &self.options
    }

    /// Raising this flag stops the nonce search of the append in progress
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn validate(&self) -> ValidationReport {
        let chain = self.chain.read().unwrap_or_else(PoisonError::into_inner);
        validate(&chain)
    }

    /// Full ledger view with per-block signature status
    pub fn audit(&self) -> LedgerView {
        LedgerView::build(self.get_all())
    }
}

fn into_persistence(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::Persistence(_) => err,
        other => LedgerError::Persistence(other.to_string()),
    }
}
