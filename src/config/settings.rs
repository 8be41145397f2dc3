use crate::core::proof_of_work::DEFAULT_MAX_ATTEMPTS;
use crate::core::{LedgerOptions, MiningLimits, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::error::{LedgerError, Result};
use crate::storage::json_file::CHAIN_FILE;
use crate::storage::{ChainStore, JsonFileStore, MemoryStore, SledStore};
use crate::wallet::KEYRING_FILE;
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Process-wide configuration for the command-line tool. Library users build
/// their own `Config` (or `LedgerOptions`) instead.
pub static GLOBAL_CONFIG: Lazy<Result<Config>> = Lazy::new(Config::load);

static DEFAULT_DATA_DIR: &str = "data";
static DEFAULT_CONFIG_FILE: &str = "ledger.toml";
const DEFAULT_DIFFICULTY: u32 = 2;
const SLED_DIR: &str = "ledger_db";

const CONFIG_FILE_KEY: &str = "LEDGER_CONFIG";
const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const STORE_KEY: &str = "LEDGER_STORE";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const MAX_ATTEMPTS_KEY: &str = "LEDGER_MAX_ATTEMPTS";
const MINING_TIMEOUT_KEY: &str = "LEDGER_MINING_TIMEOUT_MS";
const MAX_PAYLOAD_KEY: &str = "LEDGER_MAX_PAYLOAD_BYTES";
const KEYRING_KEY: &str = "LEDGER_KEYRING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sled,
    Json,
    Memory,
}

impl FromStr for StoreKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StoreKind::Sled),
            "json" => Ok(StoreKind::Json),
            "memory" => Ok(StoreKind::Memory),
            _ => Err(LedgerError::Config(format!(
                "Invalid store: {s}. Valid options: sled, json, memory"
            ))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Sled => write!(f, "sled"),
            StoreKind::Json => write!(f, "json"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Shape of `ledger.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    store: Option<StoreKind>,
    difficulty: Option<u32>,
    max_attempts: Option<u64>,
    mining_timeout_ms: Option<u64>,
    max_payload_bytes: Option<usize>,
    verify_work_on_load: Option<bool>,
    keyring: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub difficulty: u32,
    pub max_attempts: u64,
    pub mining_timeout_ms: Option<u64>,
    pub max_payload_bytes: usize,
    pub verify_work_on_load: bool,
    /// Explicit keyring location; defaults to `<data_dir>/keyring.dat`
    pub keyring: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            store: StoreKind::Sled,
            difficulty: DEFAULT_DIFFICULTY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            mining_timeout_ms: None,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            verify_work_on_load: false,
            keyring: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file named by `LEDGER_CONFIG` (or `ledger.toml`
    /// if present), then `LEDGER_*` environment variables.
    pub fn load() -> Result<Config> {
        let (path, required) = match env::var(CONFIG_FILE_KEY) {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let contents = if path.exists() {
            info!("Reading configuration from {}", path.display());
            Some(fs::read_to_string(&path)?)
        } else if required {
            return Err(LedgerError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        } else {
            None
        };

        Config::from_sources(contents.as_deref(), |key| env::var(key).ok())
    }

    /// Builds a config from optional TOML text and an environment lookup.
    pub fn from_sources<F>(toml_text: Option<&str>, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(text) = toml_text {
            let file: FileConfig = toml::from_str(text)?;
            config.apply_file(file);
        }

        if let Some(dir) = lookup(DATA_DIR_KEY) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(store) = lookup(STORE_KEY) {
            config.store = store.parse()?;
        }
        if let Some(value) = lookup(DIFFICULTY_KEY) {
            config.difficulty = parse_number(DIFFICULTY_KEY, &value)?;
        }
        if let Some(value) = lookup(MAX_ATTEMPTS_KEY) {
            config.max_attempts = parse_number(MAX_ATTEMPTS_KEY, &value)?;
        }
        if let Some(value) = lookup(MINING_TIMEOUT_KEY) {
            let ms: u64 = parse_number(MINING_TIMEOUT_KEY, &value)?;
            config.mining_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(value) = lookup(MAX_PAYLOAD_KEY) {
            config.max_payload_bytes = parse_number(MAX_PAYLOAD_KEY, &value)?;
        }
        if let Some(path) = lookup(KEYRING_KEY) {
            config.keyring = Some(PathBuf::from(path));
        }

        debug!("Effective configuration: {config:?}");
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(store) = file.store {
            self.store = store;
        }
        if let Some(difficulty) = file.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(max_attempts) = file.max_attempts {
            self.max_attempts = max_attempts;
        }
        if let Some(ms) = file.mining_timeout_ms {
            self.mining_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(max) = file.max_payload_bytes {
            self.max_payload_bytes = max;
        }
        if let Some(verify) = file.verify_work_on_load {
            self.verify_work_on_load = verify;
        }
        if file.keyring.is_some() {
            self.keyring = file.keyring;
        }
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            difficulty: self.difficulty,
            mining_limits: MiningLimits {
                max_attempts: self.max_attempts,
                timeout: self.mining_timeout_ms.map(Duration::from_millis),
            },
            max_payload_bytes: self.max_payload_bytes,
            verify_work_on_load: self.verify_work_on_load,
        }
    }

    pub fn keyring_path(&self) -> PathBuf {
        self.keyring
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KEYRING_FILE))
    }

    pub fn store_path(&self) -> PathBuf {
        match self.store {
            StoreKind::Sled => self.data_dir.join(SLED_DIR),
            StoreKind::Json => self.data_dir.join(CHAIN_FILE),
            StoreKind::Memory => self.data_dir.clone(),
        }
    }

    /// Opens the configured backend under `data_dir`
    pub fn open_store(&self) -> Result<Box<dyn ChainStore>> {
        let store: Box<dyn ChainStore> = match self.store {
            StoreKind::Sled => {
                ensure_dir(&self.data_dir)?;
                Box::new(SledStore::open(&self.store_path())?)
            }
            StoreKind::Json => Box::new(JsonFileStore::new(&self.store_path())),
            StoreKind::Memory => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        LedgerError::Config(format!("cannot create data dir {}: {e}", dir.display()))
    })
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LedgerError::Config(format!("{key} must be a number, got '{value}'")))
}
