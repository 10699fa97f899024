//! Error handling for the ledger
//!
//! Almost every failure here is a policy rejection: the operation refused to
//! run and left state untouched. The few fatal variants describe a broken
//! environment (digest/signature backend, clock, encoder, configuration) and
//! are never produced by ledger logic itself.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Which chain validation check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    /// Block signature does not verify under the block's creator
    Signature,
    /// Hash misses its difficulty or does not recompute to the stored value
    ProofOfWork,
    /// Previous-hash link does not match the predecessor
    Linkage,
    /// A contained transaction has a bad signature (deep validation only)
    TransactionSignature,
    /// A transaction id appears more than once in the chain (deep validation only)
    DuplicateTransaction,
    /// Reward exceeds mining reward plus fees (deep validation only)
    OverReward,
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationCheck::Signature => "signature is invalid",
            ValidationCheck::ProofOfWork => "hashing is bad",
            ValidationCheck::Linkage => "invalid previous block hash",
            ValidationCheck::TransactionSignature => "transaction signature is invalid",
            ValidationCheck::DuplicateTransaction => "transaction appears twice",
            ValidationCheck::OverReward => "block is over rewarded",
        };
        f.write_str(name)
    }
}

/// A failed chain validation: the block index and the check that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub index: usize,
    pub check: ValidationCheck,
}

impl ValidationError {
    pub fn new(index: usize, check: ValidationCheck) -> Self {
        ValidationError { index, check }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}: {}", self.index, self.check)
    }
}

impl std::error::Error for ValidationError {}

/// Error taxonomy for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Key does not match the block creator
    Unauthorized,
    /// Block already carries a valid proof of work
    AlreadyMined,
    /// Block has no valid proof of work yet
    NotMined,
    /// Block or transaction is already signed
    AlreadySigned,
    /// Block reached its transaction limit
    BlockFull { limit: usize },
    /// Reward transaction was already decided for this block
    RewardAlreadySet,
    /// Transaction (or index) not present in the block
    TransactionNotFound,
    /// Receiver and amount lists differ in length
    MismatchedReceivers { receivers: usize, amounts: usize },
    /// Inputs do not cover amounts plus fee
    InsufficientFunds { required: u64, available: u64 },
    /// Signature does not verify
    InvalidSignature,
    /// Block does not link to the current tip
    BrokenLink { expected: String, found: String },
    /// Transaction id already recorded in the ledger
    DuplicateTransaction(String),
    /// Reward above mining reward plus fees
    OverReward { allowed: u64, claimed: u64 },
    /// Chain validation failed
    Validation(ValidationError),
    /// Actor holds no local ledger yet
    NoLocalLedger,
    /// Candidate ledger is not strictly longer than the current one
    ShorterChain { local: usize, incoming: usize },
    /// Candidate ledger has a different genesis miner
    GenesisMismatch,
    /// Mining was interrupted before a satisfying nonce was found
    Interrupted,
    /// Digest, signature or key backend failure
    Crypto(String),
    /// System clock failure
    Clock(String),
    /// Canonical encoding failure
    Serialization(String),
    /// Invalid configuration
    Config(String),
}

impl LedgerError {
    /// Environment/capability failures that a caller cannot recover from
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Crypto(_)
                | LedgerError::Clock(_)
                | LedgerError::Serialization(_)
                | LedgerError::Config(_)
        )
    }

    /// Precondition violations; state was left unchanged
    pub fn is_rejection(&self) -> bool {
        !self.is_fatal()
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Unauthorized => write!(f, "Key is not the block creator"),
            LedgerError::AlreadyMined => write!(f, "Block is already mined"),
            LedgerError::NotMined => write!(f, "Block is not mined"),
            LedgerError::AlreadySigned => write!(f, "Already signed"),
            LedgerError::BlockFull { limit } => {
                write!(f, "Block is full: limit of {limit} transactions reached")
            }
            LedgerError::RewardAlreadySet => write!(f, "Reward transaction already set"),
            LedgerError::TransactionNotFound => write!(f, "Transaction not found in block"),
            LedgerError::MismatchedReceivers { receivers, amounts } => write!(
                f,
                "Receiver/amount mismatch: {receivers} receivers, {amounts} amounts"
            ),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::InvalidSignature => write!(f, "Invalid signature"),
            LedgerError::BrokenLink { expected, found } => write!(
                f,
                "Block does not link to tip: expected {expected}, found {found}"
            ),
            LedgerError::DuplicateTransaction(id) => {
                write!(f, "Transaction already in ledger: {id}")
            }
            LedgerError::OverReward { allowed, claimed } => {
                write!(f, "Over rewarded: allowed {allowed}, claimed {claimed}")
            }
            LedgerError::Validation(err) => write!(f, "Validation failed: {err}"),
            LedgerError::NoLocalLedger => write!(f, "No local ledger"),
            LedgerError::ShorterChain { local, incoming } => write!(
                f,
                "Incoming ledger is no longer than local: local size={local}, incoming size={incoming}"
            ),
            LedgerError::GenesisMismatch => {
                write!(f, "Incoming ledger has a different genesis miner")
            }
            LedgerError::Interrupted => write!(f, "Mining interrupted"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Clock(msg) => write!(f, "Clock error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Validation(err)
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
