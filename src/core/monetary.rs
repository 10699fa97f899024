/// Ledger policy constants
///
/// These are the reference values. A ledger can override each of them at
/// construction time through [`crate::config::LedgerConfig`].
///
/// Fixed fee charged per transaction; it is not reissued to anyone
pub const TRANSACTION_FEE: u64 = 1;

/// Fixed reward a miner may pay itself per block
pub const MINING_REWARD: u64 = 100;

/// Default proof-of-work difficulty in leading zero bits
pub const DEFAULT_DIFFICULTY: u32 = 20;

/// Upper bound on transactions per block (reward transaction excluded)
pub const TRANSACTION_UPPER_LIMIT: usize = 100;

/// Bits in a SHA-256 digest; no difficulty can exceed this
pub const MAX_DIFFICULTY: u32 = 256;
