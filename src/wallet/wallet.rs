// A wallet is an actor on the ledger: a key pair plus its own view of the chain
// The local ledger is a shared, swappable reference. Adopting another chain
// swaps the pointer under a write lock; blocks are never edited in place.

use crate::config::{LedgerConfig, GLOBAL_CONFIG};
use crate::core::{Block, Blockchain, Transaction};
use crate::error::{LedgerError, Result, ValidationCheck, ValidationError};
use crate::utils::{KeyPair, PublicKey};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct Wallet {
    name: String,
    keys: KeyPair,
    local_ledger: RwLock<Option<Arc<Blockchain>>>,
}

impl Wallet {
    /// Create a wallet with a freshly generated key pair
    pub fn new(name: &str) -> Result<Wallet> {
        Ok(Self::from_key_pair(name, KeyPair::generate()?))
    }

    pub fn from_key_pair(name: &str, keys: KeyPair) -> Wallet {
        debug!("[{name}] wallet ready at address {}", keys.public_key());
        Wallet {
            name: name.to_string(),
            keys,
            local_ledger: RwLock::new(None),
        }
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    pub fn get_address(&self) -> String {
        self.keys.public_key().address()
    }

    pub(crate) fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn local_ledger(&self) -> Option<Arc<Blockchain>> {
        self.local_ledger.read().clone()
    }

    fn require_local_ledger(&self) -> Result<Arc<Blockchain>> {
        self.local_ledger().ok_or(LedgerError::NoLocalLedger)
    }

    /// Policy of the local ledger, or the process-wide one without a ledger
    pub fn policy(&self) -> LedgerConfig {
        match self.local_ledger.read().as_ref() {
            Some(ledger) => ledger.config().clone(),
            None => GLOBAL_CONFIG.clone(),
        }
    }

    /// Offer a ledger to this wallet.
    ///
    /// An invalid ledger is always refused. Without a local ledger a valid
    /// one is taken as is; otherwise it must be strictly longer and share the
    /// local ledger's genesis miner.
    pub fn set_local_ledger(&self, ledger: Arc<Blockchain>) -> Result<()> {
        if let Err(err) = Blockchain::validate(&ledger) {
            warn!("[{}] incoming ledger failed validation: {err}", self.name);
            return Err(err.into());
        }

        let mut local = self.local_ledger.write();
        if let Some(current) = local.as_ref() {
            if ledger.len() <= current.len() {
                warn!(
                    "[{}] incoming ledger is no longer than the local one, local size={}, incoming size={}",
                    self.name,
                    current.len(),
                    ledger.len()
                );
                return Err(LedgerError::ShorterChain {
                    local: current.len(),
                    incoming: ledger.len(),
                });
            }
            if ledger.genesis_miner() != current.genesis_miner() {
                warn!(
                    "[{}] incoming ledger has a different genesis miner than the local one",
                    self.name
                );
                return Err(LedgerError::GenesisMismatch);
            }
        }

        info!(
            "[{}] adopted ledger of {} blocks, tip {}",
            self.name,
            ledger.len(),
            ledger.last_block().get_hash()
        );
        *local = Some(ledger);
        Ok(())
    }

    /// Adopt the longest valid ledger among `chains`.
    ///
    /// With a local ledger only candidates sharing its genesis miner and
    /// strictly longer than it qualify. Returns true when a candidate was
    /// adopted.
    pub fn update_local_ledger(&self, chains: &[Arc<Blockchain>]) -> bool {
        let mut local = self.local_ledger.write();
        let genesis_miner = local.as_ref().map(|ledger| ledger.genesis_miner().clone());
        let mut best_len = local.as_ref().map_or(0, |ledger| ledger.len());
        let mut best: Option<&Arc<Blockchain>> = None;

        for candidate in chains {
            if let Some(miner) = &genesis_miner {
                if candidate.genesis_miner() != miner {
                    warn!(
                        "[{}] candidate ledger has a different genesis miner than the local one",
                        self.name
                    );
                    continue;
                }
            }
            if candidate.len() <= best_len {
                warn!(
                    "[{}] candidate ledger is no longer than the best so far, best size={best_len}, candidate size={}",
                    self.name,
                    candidate.len()
                );
                continue;
            }
            if let Err(err) = Blockchain::validate(candidate) {
                warn!("[{}] candidate ledger failed validation: {err}", self.name);
                continue;
            }
            best_len = candidate.len();
            best = Some(candidate);
        }

        match best {
            Some(ledger) => {
                info!("[{}] switched to a ledger of {best_len} blocks", self.name);
                *local = Some(Arc::clone(ledger));
                true
            }
            None => false,
        }
    }

    /// Ingest a block mined elsewhere into the local ledger
    pub fn update_local_ledger_with_block(&self, block: Block) -> Result<()> {
        let ledger = self.require_local_ledger()?;
        self.verify_guest_block(&block, &ledger)?;
        ledger.append(block)
    }

    /// Check a block before it is appended to `ledger`.
    ///
    /// Unlike ledger validation this inspects every transaction: each must
    /// verify and not already be recorded in `ledger`, and the reward may not
    /// exceed the mining reward plus the block's fees.
    pub fn verify_guest_block(&self, block: &Block, ledger: &Blockchain) -> Result<()> {
        let index = ledger.len();
        if !block.verify_signature(block.get_creator()) {
            warn!("[{}] block {} signature tampered", self.name, block.get_hash());
            return Err(ValidationError::new(index, ValidationCheck::Signature).into());
        }
        if !block.is_mined() {
            warn!("[{}] block {} mining is not successful", self.name, block.get_hash());
            return Err(ValidationError::new(index, ValidationCheck::ProofOfWork).into());
        }
        let required = ledger.config().difficulty;
        if block.get_difficulty() < required {
            warn!(
                "[{}] block {} difficulty {} is below the ledger's {required}",
                self.name,
                block.get_hash(),
                block.get_difficulty()
            );
            return Err(ValidationError::new(index, ValidationCheck::ProofOfWork).into());
        }

        let tip = ledger.last_block();
        if tip.get_hash() != block.get_previous_hash() {
            warn!(
                "[{}] block {} is not linked to the last block",
                self.name,
                block.get_hash()
            );
            return Err(LedgerError::BrokenLink {
                expected: tip.get_hash().to_string(),
                found: block.get_previous_hash().to_string(),
            });
        }

        for (i, tx) in block.get_transactions().iter().enumerate() {
            if let Err(err) = self.check_transaction(tx, Some(ledger)) {
                warn!(
                    "[{}] block {} transaction {i} is invalid: {err}",
                    self.name,
                    block.get_hash()
                );
                return Err(err);
            }
        }

        if let Some(reward) = block.get_reward_transaction() {
            if !reward.verify() {
                warn!("[{}] block {} reward is not signed", self.name, block.get_hash());
                return Err(LedgerError::InvalidSignature);
            }
        }
        let config = ledger.config();
        let allowed = config
            .mining_reward
            .saturating_add(block.transaction_fee_amount(config.transaction_fee));
        let claimed = block.get_reward_amount();
        if claimed > allowed {
            warn!("[{}] block {} over rewarded", self.name, block.get_hash());
            return Err(LedgerError::OverReward { allowed, claimed });
        }
        Ok(())
    }

    /// A transaction is acceptable when its signature verifies and the local
    /// ledger does not already hold it
    pub fn validate_transaction(&self, transaction: &Transaction) -> Result<()> {
        let ledger = self.local_ledger();
        self.check_transaction(transaction, ledger.as_deref())
    }

    fn check_transaction(&self, transaction: &Transaction, ledger: Option<&Blockchain>) -> Result<()> {
        if !transaction.verify() {
            warn!(
                "[{}] transaction {} from {} has been tampered",
                self.name,
                transaction.get_id(),
                transaction.get_sender()
            );
            return Err(LedgerError::InvalidSignature);
        }
        if ledger.is_some_and(|ledger| ledger.transaction_exists(transaction)) {
            return Err(LedgerError::DuplicateTransaction(
                transaction.get_id().to_string(),
            ));
        }
        Ok(())
    }

    /// Build, prepare and sign a transaction paying `amounts[i]` to
    /// `receivers[i]` from this wallet's unspent outputs
    pub fn transfer_fund(&self, receivers: &[PublicKey], amounts: &[u64]) -> Result<Transaction> {
        let ledger = self.require_local_ledger()?;
        let fee = ledger.config().transaction_fee;
        let needed = amounts
            .iter()
            .fold(fee, |total, amount| total.saturating_add(*amount));

        let unspent = ledger.find_unspent_utxos(self.public_key());
        let available = unspent
            .iter()
            .fold(0u64, |total, utxo| total.saturating_add(utxo.get_amount()));
        if available < needed {
            warn!(
                "[{}] balance={available}, not enough to make the transfer of {needed}",
                self.name
            );
            return Err(LedgerError::InsufficientFunds {
                required: needed,
                available,
            });
        }

        let mut inputs = Vec::new();
        let mut collected = 0u64;
        for utxo in unspent {
            if collected >= needed {
                break;
            }
            collected = collected.saturating_add(utxo.get_amount());
            inputs.push(utxo);
        }

        let mut tx = Transaction::new(
            self.public_key(),
            receivers.to_vec(),
            amounts.to_vec(),
            inputs,
        )?;
        tx.prepare_outputs(fee)?;
        tx.sign(&self.keys)?;
        debug!(
            "[{}] prepared transaction {} spending {} inputs",
            self.name,
            tx.get_id(),
            tx.get_inputs().len()
        );
        Ok(tx)
    }

    pub fn transfer_fund_to(&self, receiver: &PublicKey, amount: u64) -> Result<Transaction> {
        self.transfer_fund(std::slice::from_ref(receiver), &[amount])
    }

    pub fn current_balance(&self, ledger: &Blockchain) -> i64 {
        ledger.check_balance(self.public_key())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("address", &self.get_address())
            .finish()
    }
}
