use crate::core::monetary::{
    DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MINING_REWARD, TRANSACTION_FEE, TRANSACTION_UPPER_LIMIT,
};
use crate::error::{LedgerError, Result};
use log::warn;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Ledger policy read from the environment on first use
pub static GLOBAL_CONFIG: Lazy<LedgerConfig> = Lazy::new(|| {
    LedgerConfig::from_env().unwrap_or_else(|e| {
        warn!("Ignoring ledger environment overrides: {e}");
        LedgerConfig::default()
    })
});

const TRANSACTION_FEE_KEY: &str = "LEDGER_TRANSACTION_FEE";
const MINING_REWARD_KEY: &str = "LEDGER_MINING_REWARD";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const MAX_TRANSACTIONS_KEY: &str = "LEDGER_MAX_TRANSACTIONS";

/// Fee, reward and block policy a ledger is constructed with
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub transaction_fee: u64,
    pub mining_reward: u64,
    pub difficulty: u32,
    pub max_transactions_per_block: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            transaction_fee: TRANSACTION_FEE,
            mining_reward: MINING_REWARD,
            difficulty: DEFAULT_DIFFICULTY,
            max_transactions_per_block: TRANSACTION_UPPER_LIMIT,
        }
    }
}

impl LedgerConfig {
    /// Defaults overridden by any `LEDGER_*` environment variables that are set
    pub fn from_env() -> Result<LedgerConfig> {
        let mut config = LedgerConfig::default();
        if let Some(fee) = read_env(TRANSACTION_FEE_KEY)? {
            config.transaction_fee = fee;
        }
        if let Some(reward) = read_env(MINING_REWARD_KEY)? {
            config.mining_reward = reward;
        }
        if let Some(difficulty) = read_env(DIFFICULTY_KEY)? {
            config.difficulty = difficulty;
        }
        if let Some(limit) = read_env(MAX_TRANSACTIONS_KEY)? {
            config.max_transactions_per_block = limit;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML table; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<LedgerConfig> {
        let config: LedgerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_transaction_fee(mut self, fee: u64) -> Self {
        self.transaction_fee = fee;
        self
    }

    pub fn with_mining_reward(mut self, reward: u64) -> Self {
        self.mining_reward = reward;
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_max_transactions_per_block(mut self, limit: usize) -> Self {
        self.max_transactions_per_block = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "difficulty {} exceeds {MAX_DIFFICULTY} bits",
                self.difficulty
            )));
        }
        if self.max_transactions_per_block == 0 {
            return Err(LedgerError::Config(
                "max_transactions_per_block must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LedgerError::Config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}
