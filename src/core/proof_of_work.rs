use crate::core::{Block, BlockTemplate};
use crate::error::{MiningError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Difficulty counts leading zero hex digits of a 64-digit SHA-256 hash
pub const MAX_DIFFICULTY: u32 = 64;

pub const DEFAULT_MAX_ATTEMPTS: u64 = 50_000_000;

// The clock is read once per this many attempts
const TIMEOUT_CHECK_INTERVAL: u64 = 1024;

/// Bounds on a single nonce search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningLimits {
    pub max_attempts: u64,
    pub timeout: Option<Duration>,
}

impl Default for MiningLimits {
    fn default() -> Self {
        MiningLimits {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: None,
        }
    }
}

/// Shared signal that stops a running nonce search between attempts
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct ProofOfWork {
    difficulty: u32,
    target: BigInt,
    limits: MiningLimits,
    cancel: CancelFlag,
}

impl ProofOfWork {
    pub fn new(difficulty: u32, limits: MiningLimits) -> Result<ProofOfWork> {
        let target = Self::target_for(difficulty)?;
        Ok(ProofOfWork {
            difficulty,
            target,
            limits,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> ProofOfWork {
        self.cancel = cancel;
        self
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_limits(&self) -> MiningLimits {
        self.limits
    }

    /// `difficulty` leading zero hex digits is the same as the hash, read as
    /// a big-endian integer, being below `2^(256 - 4 * difficulty)`.
    pub fn target_for(difficulty: u32) -> Result<BigInt> {
        if difficulty > MAX_DIFFICULTY {
            return Err(MiningError::InvalidDifficulty(difficulty).into());
        }
        let mut target = BigInt::from(1);
        target.shl_assign(256 - 4 * difficulty);
        Ok(target)
    }

    /// Re-checks a stored hex hash against a difficulty. Malformed hex never qualifies.
    pub fn meets_target(hash_hex: &str, difficulty: u32) -> bool {
        let Ok(target) = Self::target_for(difficulty) else {
            return false;
        };
        let Ok(hash) = HEXLOWER.decode(hash_hex.as_bytes()) else {
            return false;
        };
        if hash.len() != 32 {
            return false;
        }
        BigInt::from_bytes_be(Sign::Plus, &hash) < target
    }

    /// Validate proof-of-work for a sealed block
    pub fn validate(block: &Block, difficulty: u32) -> bool {
        block.get_nonce().is_some()
            && block.has_valid_hash()
            && Self::meets_target(block.get_hash(), difficulty)
    }

    /// Brute-force nonce search from 0 upward. Returns `(hash, nonce)`.
    pub fn seal(&self, template: &BlockTemplate) -> Result<(String, u64)> {
        let encoded = template.nonce_template()?;
        let started = Instant::now();
        let mut nonce: u64 = 0;

        info!(
            "Mining block {} with difficulty {} (cap {} attempts)",
            template.get_index(),
            self.difficulty,
            self.limits.max_attempts
        );

        while nonce < self.limits.max_attempts {
            if self.cancel.is_cancelled() {
                info!("Mining of block {} cancelled", template.get_index());
                return Err(MiningError::Cancelled { attempts: nonce }.into());
            }
            if let Some(timeout) = self.limits.timeout {
                if nonce % TIMEOUT_CHECK_INTERVAL == 0 && started.elapsed() >= timeout {
                    return Err(MiningError::TimedOut { attempts: nonce }.into());
                }
            }

            let hash = sha256_digest(&encoded.bytes_with(nonce));
            if BigInt::from_bytes_be(Sign::Plus, &hash) < self.target {
                let hash_hex = HEXLOWER.encode(&hash);
                info!(
                    "Mined block {}: {hash_hex} (nonce {nonce}, {:?})",
                    template.get_index(),
                    started.elapsed()
                );
                return Ok((hash_hex, nonce));
            }
            nonce += 1;
        }

        debug!(
            "Gave up on block {} after {} attempts",
            template.get_index(),
            self.limits.max_attempts
        );
        Err(MiningError::Exhausted {
            attempts: self.limits.max_attempts,
        }
        .into())
    }

    pub fn mine(&self, template: BlockTemplate) -> Result<Block> {
        let (hash, nonce) = self.seal(&template)?;
        Ok(template.into_block(hash, Some(nonce)))
    }
}
