//! Configuration management
//!
//! Ledger settings come from built-in defaults, an optional `ledger.toml`,
//! and `LEDGER_*` environment variables, in that order of precedence.

pub mod settings;

pub use settings::{Config, StoreKind, GLOBAL_CONFIG};
