//! # UTXO Chain - My Single-Node Proof-of-Work Ledger
//!
//! This is my in-memory blockchain simulation. There is no network and no
//! database here: "peers" are just other wallets holding a reference to a
//! ledger. When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **UTXO Model**: outputs are immutable and content-addressed; "spent" is
//!   derived by scanning the ledger, never stored
//! - **Transactions**: signed exactly once with ECDSA P-256, ids are SHA-256
//!   digests of a canonical bincode encoding
//! - **Blocks**: Merkle root over transaction ids, proof-of-work measured in
//!   leading zero bits, signed by their creator after mining
//! - **Ledger**: append-only, validated from tip to genesis, with a separate
//!   deep validation for transaction integrity
//! - **Wallets and Miners**: fund transfers, longest-chain adoption, guest
//!   block ingestion, self-rewarding and interruptible mining
//!
//! ## How I Organized My Code
//! - `core/`: UTXOs, transactions, Merkle tree, proof of work, blocks, ledger
//! - `wallet/`: the actors that use the ledger
//! - `config/`: fee, reward, difficulty and block-size policy
//! - `error/`: rejections vs fatal capability failures
//! - `utils/`: digest, signature, key and encoding helpers
//!
//! ## Key Design Decisions I Made
//! - Blocks live behind `Arc` so handing a ledger to another actor is cheap
//! - A wallet's local ledger is a pointer swapped under a lock
//! - "Mined" is derived from the hash, not a stored flag
//! - `validate` deliberately skips transactions; `validate_deep` does not
//!
//! ## When I Need to Understand Something
//! 1. Start with `core/blockchain.rs` for validation and balances
//! 2. Look at `core/block.rs` for mining and signing rules
//! 3. Check `core/transaction.rs` for how value moves
//! 4. Review `wallet/wallet.rs` for fork choice and block ingestion

pub mod config;
pub mod core;
pub mod error;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use config::{LedgerConfig, GLOBAL_CONFIG};
pub use core::{
    hash_meets_difficulty, AccountSummary, Block, Blockchain, MerkleTree, MiningOutcome,
    ProofOfWork, Transaction, Utxo, UtxoKind, MINING_REWARD, TRANSACTION_FEE,
};
pub use error::{LedgerError, Result, ValidationCheck, ValidationError};
pub use utils::{KeyPair, PublicKey};
pub use wallet::{Miner, Wallet};
