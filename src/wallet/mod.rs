//! Ledger actors
//!
//! A wallet holds a key pair and its own view of the ledger: it builds
//! signed transfers, adopts longer chains and ingests guest blocks. A miner
//! is a wallet that also creates, rewards, mines and signs blocks.

pub mod miner;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use miner::Miner;
pub use wallet::Wallet;
