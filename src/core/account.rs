// Account view of one identity, derived from a full scan of the ledger
// Nothing here is stored between queries: every summary is rebuilt from
// block history, which costs O(blocks x transactions per block).

use crate::core::{Transaction, Utxo};
use std::collections::HashSet;

/// Everything the ledger says about one identity
#[derive(Debug, Clone, Default)]
pub struct AccountSummary {
    received: Vec<Utxo>,
    spent: Vec<Utxo>,
    spent_ids: HashSet<String>,
    sent_transactions: Vec<Transaction>,
    rewards: Vec<Utxo>,
    total_received: u64,
    total_spent: u64,
}

impl AccountSummary {
    pub fn new() -> AccountSummary {
        AccountSummary::default()
    }

    pub(crate) fn record_received(&mut self, utxo: &Utxo) {
        self.total_received = self.total_received.saturating_add(utxo.get_amount());
        self.received.push(utxo.clone());
    }

    pub(crate) fn record_reward(&mut self, utxo: &Utxo) {
        self.record_received(utxo);
        self.rewards.push(utxo.clone());
    }

    // An input spent twice on the chain only counts once
    pub(crate) fn record_spent(&mut self, utxo: &Utxo) {
        if self.spent_ids.insert(utxo.get_id().to_string()) {
            self.total_spent = self.total_spent.saturating_add(utxo.get_amount());
            self.spent.push(utxo.clone());
        }
    }

    pub(crate) fn record_sent(&mut self, transaction: &Transaction) {
        self.sent_transactions.push(transaction.clone());
    }

    /// Every output ever paid to the identity, rewards included
    pub fn get_received(&self) -> &[Utxo] {
        self.received.as_slice()
    }

    pub fn get_spent(&self) -> &[Utxo] {
        self.spent.as_slice()
    }

    /// Received outputs no later transaction of the identity consumed
    pub fn get_unspent(&self) -> Vec<Utxo> {
        self.received
            .iter()
            .filter(|utxo| !self.spent_ids.contains(utxo.get_id()))
            .cloned()
            .collect()
    }

    pub fn get_sent_transactions(&self) -> &[Transaction] {
        self.sent_transactions.as_slice()
    }

    pub fn get_rewards(&self) -> &[Utxo] {
        self.rewards.as_slice()
    }

    pub fn get_total_received(&self) -> u64 {
        self.total_received
    }

    pub fn get_total_spent(&self) -> u64 {
        self.total_spent
    }

    /// Total received minus total spent
    pub fn balance(&self) -> i64 {
        let received = i64::try_from(self.total_received).unwrap_or(i64::MAX);
        let spent = i64::try_from(self.total_spent).unwrap_or(i64::MAX);
        received.saturating_sub(spent)
    }
}
