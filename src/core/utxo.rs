// Unspent transaction outputs: immutable, content-addressed units of value
// A UTXO is owned by the transaction that produced it and only referenced by
// later transactions that spend it. "Spent" is never stored here.

use crate::error::Result;
use crate::utils::{current_timestamp, digest_to_id, next_sequence, serialize, PublicKey};
use std::hash::{Hash, Hasher};

/// Whether an output moves existing value or pays a block reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtxoKind {
    Transfer,
    Reward,
}

#[derive(bincode::Encode)]
struct UtxoMessage<'a> {
    parent_transaction_id: &'a str,
    sender: &'a [u8],
    receiver: &'a [u8],
    amount: u64,
    timestamp: i64,
    sequence: u64,
    is_reward: bool,
}

#[derive(Debug, Clone)]
pub struct Utxo {
    id: String,
    parent_transaction_id: String,
    sender: PublicKey,
    receiver: PublicKey,
    amount: u64,
    timestamp: i64,
    sequence: u64,
    kind: UtxoKind,
}

impl Utxo {
    pub fn new(
        parent_transaction_id: &str,
        sender: &PublicKey,
        receiver: &PublicKey,
        amount: u64,
    ) -> Result<Utxo> {
        Self::with_kind(
            parent_transaction_id,
            sender,
            receiver,
            amount,
            UtxoKind::Transfer,
        )
    }

    pub fn new_reward(
        parent_transaction_id: &str,
        sender: &PublicKey,
        receiver: &PublicKey,
        amount: u64,
    ) -> Result<Utxo> {
        Self::with_kind(
            parent_transaction_id,
            sender,
            receiver,
            amount,
            UtxoKind::Reward,
        )
    }

    fn with_kind(
        parent_transaction_id: &str,
        sender: &PublicKey,
        receiver: &PublicKey,
        amount: u64,
        kind: UtxoKind,
    ) -> Result<Utxo> {
        let mut utxo = Utxo {
            id: String::new(),
            parent_transaction_id: parent_transaction_id.to_string(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount,
            timestamp: current_timestamp()?,
            sequence: next_sequence(),
            kind,
        };
        utxo.id = utxo.compute_id()?;
        Ok(utxo)
    }

    fn compute_id(&self) -> Result<String> {
        let message = UtxoMessage {
            parent_transaction_id: &self.parent_transaction_id,
            sender: self.sender.as_bytes(),
            receiver: self.receiver.as_bytes(),
            amount: self.amount,
            timestamp: self.timestamp,
            sequence: self.sequence,
            is_reward: self.is_mining_reward(),
        };
        Ok(digest_to_id(&serialize(&message)?))
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_parent_transaction_id(&self) -> &str {
        self.parent_transaction_id.as_str()
    }

    pub fn get_sender(&self) -> &PublicKey {
        &self.sender
    }

    pub fn get_receiver(&self) -> &PublicKey {
        &self.receiver
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn get_kind(&self) -> UtxoKind {
        self.kind
    }

    pub fn is_mining_reward(&self) -> bool {
        self.kind == UtxoKind::Reward
    }
}

impl PartialEq for Utxo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Utxo {}

impl Hash for Utxo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
