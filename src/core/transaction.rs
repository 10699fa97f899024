// This file implements transactions - how value moves between identities
// A transaction consumes UTXOs as inputs and produces new UTXOs as outputs.
// Its id covers sender, timestamp, sequence, every (receiver, amount) pair and
// every input id. Outputs are attached after the id is fixed, so they are not
// part of it.

use crate::core::Utxo;
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, digest_to_id, next_sequence, serialize, KeyPair, PublicKey};
use log::debug;
use std::hash::{Hash, Hasher};

#[derive(bincode::Encode)]
struct TransactionMessage<'a> {
    sender: &'a [u8],
    timestamp: i64,
    sequence: u64,
    transfers: Vec<(&'a [u8], u64)>,
    input_ids: Vec<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    id: String,
    sender: PublicKey,
    receivers: Vec<PublicKey>,
    amounts: Vec<u64>,
    timestamp: i64,
    sequence: u64,
    inputs: Vec<Utxo>,
    outputs: Vec<Utxo>,
    signature: Option<Vec<u8>>,
}

impl Transaction {
    /// Create a transaction paying `amounts[i]` to `receivers[i]` from `inputs`
    pub fn new(
        sender: &PublicKey,
        receivers: Vec<PublicKey>,
        amounts: Vec<u64>,
        inputs: Vec<Utxo>,
    ) -> Result<Transaction> {
        if receivers.len() != amounts.len() {
            return Err(LedgerError::MismatchedReceivers {
                receivers: receivers.len(),
                amounts: amounts.len(),
            });
        }

        let mut tx = Transaction {
            id: String::new(),
            sender: sender.clone(),
            receivers,
            amounts,
            timestamp: current_timestamp()?,
            sequence: next_sequence(),
            inputs,
            outputs: Vec::with_capacity(4),
            signature: None,
        };
        tx.id = digest_to_id(&tx.message_data()?);
        Ok(tx)
    }

    pub fn new_single(
        sender: &PublicKey,
        receiver: &PublicKey,
        amount: u64,
        inputs: Vec<Utxo>,
    ) -> Result<Transaction> {
        Self::new(sender, vec![receiver.clone()], vec![amount], inputs)
    }

    // Canonical message: the id is its digest and the signature covers it
    fn message_data(&self) -> Result<Vec<u8>> {
        let message = TransactionMessage {
            sender: self.sender.as_bytes(),
            timestamp: self.timestamp,
            sequence: self.sequence,
            transfers: self
                .receivers
                .iter()
                .zip(self.amounts.iter())
                .map(|(receiver, amount)| (receiver.as_bytes(), *amount))
                .collect(),
            input_ids: self.inputs.iter().map(|input| input.get_id()).collect(),
        };
        serialize(&message)
    }

    /// Sum of the amounts sent to receivers, fee excluded
    pub fn get_total_funds_to_transfer(&self) -> u64 {
        self.amounts
            .iter()
            .fold(0u64, |total, amount| total.saturating_add(*amount))
    }

    /// Sum of the amounts carried by the inputs
    pub fn get_input_value(&self) -> u64 {
        self.inputs
            .iter()
            .fold(0u64, |total, input| total.saturating_add(input.get_amount()))
    }

    /// Build one output per receiver plus a change output back to the sender.
    ///
    /// Fails when the inputs cannot cover the amounts plus `fee`. Any
    /// previously prepared outputs are replaced, so calling this again on an
    /// unsigned transaction yields the same shape of outputs.
    pub fn prepare_outputs(&mut self, fee: u64) -> Result<()> {
        if self.is_signed() {
            return Err(LedgerError::AlreadySigned);
        }

        let total_cost = self.get_total_funds_to_transfer().saturating_add(fee);
        let available = self.get_input_value();
        if available < total_cost {
            return Err(LedgerError::InsufficientFunds {
                required: total_cost,
                available,
            });
        }

        let mut outputs = Vec::with_capacity(self.receivers.len() + 1);
        for (receiver, amount) in self.receivers.iter().zip(self.amounts.iter()) {
            outputs.push(Utxo::new(&self.id, &self.sender, receiver, *amount)?);
        }
        outputs.push(Utxo::new(
            &self.id,
            &self.sender,
            &self.sender,
            available - total_cost,
        )?);

        self.outputs = outputs;
        Ok(())
    }

    /// Attach an output; ignored once the transaction is signed
    pub fn add_output(&mut self, output: Utxo) -> bool {
        if self.is_signed() {
            return false;
        }
        self.outputs.push(output);
        true
    }

    /// Sign the canonical message. Signing happens at most once.
    pub fn sign(&mut self, keys: &KeyPair) -> Result<()> {
        if self.is_signed() {
            debug!("Transaction {} already signed, ignoring", self.id);
            return Ok(());
        }
        let signature = keys.sign(&self.message_data()?)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Check the stored signature against the sender's public key
    pub fn verify(&self) -> bool {
        let Some(signature) = self.signature.as_ref() else {
            return false;
        };
        match self.message_data() {
            Ok(message) => self.sender.verify(signature, &message),
            Err(e) => {
                log::error!("Could not rebuild message for {}: {e}", self.id);
                false
            }
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_sender(&self) -> &PublicKey {
        &self.sender
    }

    pub fn get_receivers(&self) -> &[PublicKey] {
        self.receivers.as_slice()
    }

    pub fn get_amounts(&self) -> &[u64] {
        self.amounts.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn get_inputs(&self) -> &[Utxo] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[Utxo] {
        self.outputs.as_slice()
    }

    pub fn get_signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }
}

// Two transactions are the same transaction iff their ids match
impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
