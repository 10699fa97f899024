//! Configuration management
//!
//! Ledger policy values (fee, reward, difficulty, block size) with
//! environment and TOML overrides on top of the reference constants.

pub mod settings;

pub use settings::{LedgerConfig, GLOBAL_CONFIG};
