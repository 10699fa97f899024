// A miner is a wallet that also builds, rewards, mines and signs blocks

use crate::core::{Block, Blockchain, MiningOutcome, Transaction, Utxo};
use crate::error::{LedgerError, Result};
use crate::utils::{KeyPair, PublicKey};
use crate::wallet::Wallet;
use log::{info, warn};
use std::sync::atomic::AtomicBool;

#[derive(Debug)]
pub struct Miner {
    wallet: Wallet,
}

impl Miner {
    pub fn new(name: &str) -> Result<Miner> {
        Ok(Miner {
            wallet: Wallet::new(name)?,
        })
    }

    pub fn from_key_pair(name: &str, keys: KeyPair) -> Miner {
        Miner {
            wallet: Wallet::from_key_pair(name, keys),
        }
    }

    pub fn from_wallet(wallet: Wallet) -> Miner {
        Miner { wallet }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn public_key(&self) -> &PublicKey {
        self.wallet.public_key()
    }

    /// New empty block on top of `ledger`, limited by the ledger's policy.
    /// `difficulty` may not be below the ledger's configured difficulty.
    pub fn create_new_block(&self, ledger: &Blockchain, difficulty: u32) -> Result<Block> {
        let required = ledger.config().difficulty;
        if difficulty < required {
            warn!(
                "[{}] difficulty {difficulty} is below the ledger's {required}",
                self.wallet.get_name()
            );
            return Err(LedgerError::Config(format!(
                "difficulty {difficulty} is below the ledger's {required}"
            )));
        }
        let block = Block::new(ledger.last_block().get_hash(), difficulty, self.public_key())?;
        Ok(block.with_transaction_limit(ledger.config().max_transactions_per_block))
    }

    /// Validate a transaction, then add it to a block this miner created
    pub fn add_transaction(&self, transaction: Transaction, block: &mut Block) -> Result<()> {
        self.wallet.validate_transaction(&transaction)?;
        block.add_transaction(transaction, self.public_key())
    }

    pub fn delete_transaction(&self, transaction: &Transaction, block: &mut Block) -> Result<()> {
        block.delete_transaction(transaction, self.public_key())
    }

    /// Pay this miner the mining reward plus the fees of the block's
    /// transactions. Add transactions first: the fee part is fixed here.
    pub fn generate_reward_transaction(&self, block: &mut Block) -> Result<()> {
        let policy = self.wallet.policy();
        let amount = policy
            .mining_reward
            .saturating_add(block.transaction_fee_amount(policy.transaction_fee));

        let me = self.public_key();
        let mut reward = Transaction::new_single(me, me, amount, vec![])?;
        let output = Utxo::new_reward(reward.get_id(), me, me, amount)?;
        reward.add_output(output);
        reward.sign(self.wallet.keys())?;
        block.set_reward_transaction(Some(reward), me)?;
        info!("[{}] rewarded itself {amount}", self.wallet.get_name());
        Ok(())
    }

    /// Mine the block, then sign its hash
    pub fn mine_block(&self, block: &mut Block) -> Result<()> {
        if !block.mine(self.public_key())? {
            warn!(
                "[{}] cannot mine a block created by {}",
                self.wallet.get_name(),
                block.get_creator()
            );
            return Err(LedgerError::Unauthorized);
        }
        self.sign_block(block)
    }

    /// Like [`Miner::mine_block`], but stops between nonces once `cancel` is
    /// raised. An interrupted block keeps its search position, so a later
    /// call picks up where this one stopped.
    pub fn mine_block_interruptible(&self, block: &mut Block, cancel: &AtomicBool) -> Result<()> {
        match block.mine_interruptible(self.public_key(), cancel)? {
            MiningOutcome::Mined | MiningOutcome::AlreadyMined => self.sign_block(block),
            MiningOutcome::Unauthorized => Err(LedgerError::Unauthorized),
            MiningOutcome::Interrupted => {
                info!(
                    "[{}] mining interrupted at nonce {}",
                    self.wallet.get_name(),
                    block.get_nonce()
                );
                Err(LedgerError::Interrupted)
            }
        }
    }

    fn sign_block(&self, block: &mut Block) -> Result<()> {
        if block.is_signed() && block.verify_signature(self.public_key()) {
            return Ok(());
        }
        let signature = self.wallet.keys().sign(block.get_hash().as_bytes())?;
        block.sign(self.public_key(), signature)
    }
}
