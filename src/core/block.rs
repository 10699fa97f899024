use crate::core::monetary::{MAX_DIFFICULTY, TRANSACTION_UPPER_LIMIT};
use crate::core::proof_of_work::{hash_meets_difficulty, PowOutcome};
use crate::core::{MerkleTree, ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, PublicKey};
use log::{debug, info};
use std::sync::atomic::AtomicBool;

/// Previous-hash marker carried by a genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// What a mining call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    /// A satisfying nonce was found by this call
    Mined,
    /// The block already had a valid proof of work; nothing changed
    AlreadyMined,
    /// The key is not the block creator; nothing changed
    Unauthorized,
    /// The search was cancelled; calling again resumes from the next nonce
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct Block {
    previous_hash: String,
    timestamp: i64,
    difficulty: u32,
    creator: PublicKey,
    transactions: Vec<Transaction>,
    reward_transaction: Option<Transaction>,
    reward_decided: bool,
    nonce: u64,
    hash: String,
    signature: Option<Vec<u8>>,
    transaction_limit: usize,
}

impl Block {
    /// Empty block; a difficulty above the hash width could never be mined
    pub fn new(previous_hash: &str, difficulty: u32, creator: &PublicKey) -> Result<Block> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "difficulty {difficulty} exceeds {MAX_DIFFICULTY} bits"
            )));
        }
        Ok(Block {
            previous_hash: previous_hash.to_string(),
            timestamp: current_timestamp()?,
            difficulty,
            creator: creator.clone(),
            transactions: vec![],
            reward_transaction: None,
            reward_decided: false,
            nonce: 0,
            hash: String::new(),
            signature: None,
            transaction_limit: TRANSACTION_UPPER_LIMIT,
        })
    }

    pub fn new_genesis(difficulty: u32, creator: &PublicKey) -> Result<Block> {
        Self::new(GENESIS_PREVIOUS_HASH, difficulty, creator)
    }

    pub fn with_transaction_limit(mut self, limit: usize) -> Block {
        self.transaction_limit = limit;
        self
    }

    /// Merkle root over transaction ids, with the reward id appended last
    pub fn compute_merkle_root(&self) -> String {
        let mut ids: Vec<&str> = self.transactions.iter().map(|tx| tx.get_id()).collect();
        if let Some(reward) = &self.reward_transaction {
            ids.push(reward.get_id());
        }
        MerkleTree::calculate_merkle_root(&ids)
    }

    fn proof_of_work<'a>(&'a self, merkle_root: &'a str) -> ProofOfWork<'a> {
        ProofOfWork::new(
            &self.previous_hash,
            self.timestamp,
            merkle_root,
            self.difficulty,
        )
    }

    /// Recompute the hash for the current contents and nonce
    pub fn compute_hash(&self) -> Result<String> {
        let merkle_root = self.compute_merkle_root();
        self.proof_of_work(&merkle_root).compute_hash(self.nonce)
    }

    /// A block is mined when its stored hash meets its difficulty and
    /// recomputes identically from its contents
    pub fn is_mined(&self) -> bool {
        if self.hash.is_empty() || !hash_meets_difficulty(&self.hash, self.difficulty) {
            return false;
        }
        matches!(self.compute_hash(), Ok(hash) if hash == self.hash)
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    fn check_mutable(&self, key: &PublicKey) -> Result<()> {
        if key != &self.creator {
            return Err(LedgerError::Unauthorized);
        }
        if self.is_signed() {
            return Err(LedgerError::AlreadySigned);
        }
        if self.is_mined() {
            return Err(LedgerError::AlreadyMined);
        }
        Ok(())
    }

    pub fn add_transaction(&mut self, transaction: Transaction, key: &PublicKey) -> Result<()> {
        self.check_mutable(key)?;
        if self.transactions.len() >= self.transaction_limit {
            return Err(LedgerError::BlockFull {
                limit: self.transaction_limit,
            });
        }
        self.transactions.push(transaction);
        Ok(())
    }

    pub fn delete_transaction(&mut self, transaction: &Transaction, key: &PublicKey) -> Result<()> {
        self.check_mutable(key)?;
        let index = self
            .transactions
            .iter()
            .position(|tx| tx == transaction)
            .ok_or(LedgerError::TransactionNotFound)?;
        self.transactions.remove(index);
        Ok(())
    }

    pub fn delete_transaction_at(&mut self, index: usize, key: &PublicKey) -> Result<Transaction> {
        self.check_mutable(key)?;
        if index >= self.transactions.len() {
            return Err(LedgerError::TransactionNotFound);
        }
        Ok(self.transactions.remove(index))
    }

    /// Decide the reward transaction; `None` means the creator pays itself nothing.
    /// This can happen only once per block.
    pub fn set_reward_transaction(
        &mut self,
        reward: Option<Transaction>,
        key: &PublicKey,
    ) -> Result<()> {
        self.check_mutable(key)?;
        if self.reward_decided {
            return Err(LedgerError::RewardAlreadySet);
        }
        self.reward_transaction = reward;
        self.reward_decided = true;
        Ok(())
    }

    /// Mine the block; `Ok(true)` once the block holds a valid proof of work
    pub fn mine(&mut self, key: &PublicKey) -> Result<bool> {
        match self.mine_with(key, None)? {
            MiningOutcome::Mined | MiningOutcome::AlreadyMined => Ok(true),
            MiningOutcome::Unauthorized | MiningOutcome::Interrupted => Ok(self.is_mined()),
        }
    }

    /// Mine the block, checking `cancel` between nonce iterations
    pub fn mine_interruptible(
        &mut self,
        key: &PublicKey,
        cancel: &AtomicBool,
    ) -> Result<MiningOutcome> {
        self.mine_with(key, Some(cancel))
    }

    fn mine_with(&mut self, key: &PublicKey, cancel: Option<&AtomicBool>) -> Result<MiningOutcome> {
        if key != &self.creator {
            debug!("Refusing to mine block for a key that is not its creator");
            return Ok(MiningOutcome::Unauthorized);
        }
        if self.is_signed() || self.is_mined() {
            return Ok(MiningOutcome::AlreadyMined);
        }

        info!(
            "Starting proof-of-work with difficulty {} over {} transactions",
            self.difficulty,
            self.transactions.len()
        );
        let merkle_root = self.compute_merkle_root();
        let outcome = self.proof_of_work(&merkle_root).run(self.nonce, cancel)?;
        match outcome {
            PowOutcome::Found { nonce, hash } => {
                info!("Proof-of-work completed at nonce {nonce}");
                self.nonce = nonce;
                self.hash = hash;
                Ok(MiningOutcome::Mined)
            }
            PowOutcome::Interrupted { next_nonce } => {
                self.nonce = next_nonce;
                Ok(MiningOutcome::Interrupted)
            }
        }
    }

    /// Attach the creator's signature over the block hash
    pub fn sign(&mut self, key: &PublicKey, signature: Vec<u8>) -> Result<()> {
        if self.is_signed() {
            return Err(LedgerError::AlreadySigned);
        }
        if key != &self.creator {
            return Err(LedgerError::Unauthorized);
        }
        if !self.is_mined() {
            return Err(LedgerError::NotMined);
        }
        if !key.verify(&signature, self.hash.as_bytes()) {
            return Err(LedgerError::InvalidSignature);
        }
        self.signature = Some(signature);
        Ok(())
    }

    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        match &self.signature {
            Some(signature) => key.verify(signature, self.hash.as_bytes()),
            None => false,
        }
    }

    /// Fees owed for the block's transactions; the reward transaction pays none
    pub fn transaction_fee_amount(&self, fee: u64) -> u64 {
        (self.transactions.len() as u64).saturating_mul(fee)
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_creator(&self) -> &PublicKey {
        &self.creator
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_transaction(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    pub fn number_of_transactions(&self) -> usize {
        self.transactions.len()
    }

    pub fn get_reward_transaction(&self) -> Option<&Transaction> {
        self.reward_transaction.as_ref()
    }

    /// Value the reward transaction claims: the larger of its declared
    /// amount and its output total, zero without one
    pub fn get_reward_amount(&self) -> u64 {
        self.reward_transaction.as_ref().map_or(0, |reward| {
            let paid = reward
                .get_outputs()
                .iter()
                .fold(0u64, |total, output| total.saturating_add(output.get_amount()));
            paid.max(reward.get_total_funds_to_transfer())
        })
    }

    pub fn get_transaction_limit(&self) -> usize {
        self.transaction_limit
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: String) {
        self.previous_hash = previous_hash;
    }

    #[cfg(test)]
    pub(crate) fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }
}
