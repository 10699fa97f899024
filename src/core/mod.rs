//! Core ledger functionality
//!
//! This module contains the ledger data model: unspent outputs, transactions,
//! blocks with their Merkle root and proof of work, and the ledger itself
//! with validation and balance queries.

pub mod account;
pub mod block;
pub mod blockchain;
pub mod merkle;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;
pub mod utxo;

pub use account::AccountSummary;
pub use block::{Block, MiningOutcome, GENESIS_PREVIOUS_HASH};
pub use blockchain::Blockchain;
pub use merkle::MerkleTree;
pub use monetary::{
    DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MINING_REWARD, TRANSACTION_FEE, TRANSACTION_UPPER_LIMIT,
};
pub use proof_of_work::{hash_meets_difficulty, to_binary_string, PowOutcome, ProofOfWork};
pub use transaction::Transaction;
pub use utxo::{Utxo, UtxoKind};
