// This is the ledger: an append-only, in-memory list of mined and signed blocks
// Blocks are shared behind Arc, so a snapshot handed to another actor costs a
// vector of pointers. The block list sits behind a parking_lot RwLock: appends
// take the write lock, queries and validation take the read lock and never see
// a half-appended tip.

use crate::config::{LedgerConfig, GLOBAL_CONFIG};
use crate::core::{AccountSummary, Block, Transaction, Utxo};
use crate::error::{LedgerError, Result, ValidationCheck, ValidationError};
use crate::utils::PublicKey;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Blockchain {
    // Never empty: the genesis block is always at index 0
    blocks: RwLock<Vec<Arc<Block>>>,
    genesis: Arc<Block>,
    config: LedgerConfig,
}

impl Blockchain {
    /// Start a ledger from its genesis block under the process-wide policy
    pub fn new(genesis: Block) -> Blockchain {
        Self::with_config(genesis, GLOBAL_CONFIG.clone())
    }

    /// Start a ledger from its genesis block under an explicit policy.
    /// The genesis block is accepted as is; `validate` judges it later.
    pub fn with_config(genesis: Block, config: LedgerConfig) -> Blockchain {
        let genesis = Arc::new(genesis);
        info!(
            "Created ledger with genesis block {} mined by {}",
            genesis.get_hash(),
            genesis.get_creator()
        );
        Blockchain {
            blocks: RwLock::new(vec![Arc::clone(&genesis)]),
            genesis,
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_blocks(blocks: Vec<Block>, config: LedgerConfig) -> Blockchain {
        let blocks: Vec<Arc<Block>> = blocks.into_iter().map(Arc::new).collect();
        Blockchain {
            genesis: Arc::clone(&blocks[0]),
            blocks: RwLock::new(blocks),
            config,
        }
    }

    /// Append a block that links to the current tip.
    ///
    /// The block is dropped, not queued, when its previous hash does not
    /// match the tip's hash.
    pub fn append(&self, block: Block) -> Result<()> {
        let mut blocks = self.blocks.write();
        let tip_hash = blocks
            .last()
            .map(|tip| tip.get_hash().to_string())
            .unwrap_or_default();

        if block.get_previous_hash() != tip_hash {
            warn!(
                "Rejected block from {}: previous hash does not match tip",
                block.get_creator()
            );
            return Err(LedgerError::BrokenLink {
                expected: tip_hash,
                found: block.get_previous_hash().to_string(),
            });
        }

        info!(
            "Appended block {} at height {}",
            block.get_hash(),
            blocks.len()
        );
        blocks.push(Arc::new(block));
        Ok(())
    }

    /// Check every block's signature, proof of work and link.
    ///
    /// Walks from the tip back to index 1, then checks the genesis block for
    /// signature and proof of work only. Transactions inside blocks are not
    /// inspected here; see [`Blockchain::validate_deep`].
    pub fn validate(ledger: &Blockchain) -> std::result::Result<(), ValidationError> {
        let blocks = ledger.blocks.read();
        Self::validate_blocks(&blocks)
    }

    fn validate_blocks(blocks: &[Arc<Block>]) -> std::result::Result<(), ValidationError> {
        for index in (0..blocks.len()).rev() {
            let block = &blocks[index];
            if !block.verify_signature(block.get_creator()) {
                return Err(Self::failure(index, ValidationCheck::Signature));
            }
            if !block.is_mined() {
                return Err(Self::failure(index, ValidationCheck::ProofOfWork));
            }
            if index > 0 && block.get_previous_hash() != blocks[index - 1].get_hash() {
                return Err(Self::failure(index, ValidationCheck::Linkage));
            }
        }
        Ok(())
    }

    fn failure(index: usize, check: ValidationCheck) -> ValidationError {
        let err = ValidationError::new(index, check);
        debug!("Ledger validation failed: {err}");
        err
    }

    pub fn is_valid(&self) -> bool {
        Self::validate(self).is_ok()
    }

    /// `validate` plus transaction integrity: every transaction and reward is
    /// signature-valid, no transaction id occurs twice, and no reward exceeds
    /// the mining reward plus the block's fees.
    pub fn validate_deep(ledger: &Blockchain) -> std::result::Result<(), ValidationError> {
        let blocks = ledger.blocks.read();
        Self::validate_blocks(&blocks)?;

        let config = &ledger.config;
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, block) in blocks.iter().enumerate() {
            let contents = block
                .get_transactions()
                .iter()
                .chain(block.get_reward_transaction());
            for tx in contents {
                if !tx.verify() {
                    return Err(Self::failure(index, ValidationCheck::TransactionSignature));
                }
                if !seen.insert(tx.get_id()) {
                    return Err(Self::failure(index, ValidationCheck::DuplicateTransaction));
                }
            }

            let allowed = config
                .mining_reward
                .saturating_add(block.transaction_fee_amount(config.transaction_fee));
            if block.get_reward_amount() > allowed {
                return Err(Self::failure(index, ValidationCheck::OverReward));
            }
        }
        Ok(())
    }

    /// True when a transaction with the same id sits in any non-genesis block
    pub fn transaction_exists(&self, transaction: &Transaction) -> bool {
        let blocks = self.blocks.read();
        blocks
            .iter()
            .skip(1)
            .flat_map(|block| block.get_transactions())
            .any(|tx| tx == transaction)
    }

    /// Scan the whole ledger for outputs paid to and inputs spent by `key`
    pub fn find_related_utxos(&self, key: &PublicKey) -> AccountSummary {
        let blocks = self.blocks.read();
        let mut summary = AccountSummary::new();

        for (index, block) in blocks.iter().enumerate() {
            for tx in block.get_transactions() {
                if index != 0 && tx.get_sender() == key {
                    for input in tx.get_inputs() {
                        summary.record_spent(input);
                    }
                    summary.record_sent(tx);
                }
                for output in tx.get_outputs() {
                    if output.get_receiver() == key {
                        summary.record_received(output);
                    }
                }
            }

            if block.get_creator() == key {
                let reward = block
                    .get_reward_transaction()
                    .and_then(|reward| reward.get_outputs().first());
                if let Some(output) = reward {
                    if output.get_receiver() == key {
                        summary.record_reward(output);
                    } else {
                        warn!(
                            "Block {} pays its reward to someone other than its creator",
                            block.get_hash()
                        );
                    }
                }
            }
        }
        summary
    }

    pub fn find_unspent_utxos(&self, key: &PublicKey) -> Vec<Utxo> {
        self.find_related_utxos(key).get_unspent()
    }

    pub fn check_balance(&self, key: &PublicKey) -> i64 {
        self.find_related_utxos(key).balance()
    }

    /// Shallow copy: a new block list sharing the same immutable blocks
    pub fn snapshot(&self) -> Blockchain {
        Blockchain {
            blocks: RwLock::new(self.blocks.read().clone()),
            genesis: Arc::clone(&self.genesis),
            config: self.config.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Always false: the genesis block is never removed
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn genesis_block(&self) -> Arc<Block> {
        Arc::clone(&self.genesis)
    }

    pub fn genesis_miner(&self) -> &PublicKey {
        self.genesis.get_creator()
    }

    pub fn last_block(&self) -> Arc<Block> {
        self.blocks
            .read()
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.genesis))
    }

    pub fn block(&self, index: usize) -> Option<Arc<Block>> {
        self.blocks.read().get(index).cloned()
    }

    pub fn blocks(&self) -> Vec<Arc<Block>> {
        self.blocks.read().clone()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("len", &self.len())
            .field("genesis_miner", self.genesis_miner())
            .field("tip", &self.last_block().get_hash())
            .finish()
    }
}
