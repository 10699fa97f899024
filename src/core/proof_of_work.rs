use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

const PROGRESS_INTERVAL: u64 = 100_000;

#[derive(bincode::Encode)]
struct HashMessage<'a> {
    previous_hash: &'a str,
    timestamp: i64,
    merkle_root: &'a str,
    nonce: u64,
}

/// Render a digest as a bit string.
///
/// Each byte is lifted from the signed range to `0..=255` by adding 128 and
/// written as 8 binary digits, most significant first.
pub fn to_binary_string(digest: &[u8]) -> String {
    let mut bits = String::with_capacity(digest.len() * 8);
    for byte in digest {
        bits.push_str(&format!("{:08b}", byte.wrapping_add(128)));
    }
    bits
}

/// True when the first `difficulty` characters of `hash` are all '0'
pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|c| c == b'0')
}

/// Result of a nonce search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowOutcome {
    Found { nonce: u64, hash: String },
    Interrupted { next_nonce: u64 },
}

/// Nonce search over the fixed part of a block header
pub struct ProofOfWork<'a> {
    previous_hash: &'a str,
    timestamp: i64,
    merkle_root: &'a str,
    difficulty: u32,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(
        previous_hash: &'a str,
        timestamp: i64,
        merkle_root: &'a str,
        difficulty: u32,
    ) -> ProofOfWork<'a> {
        ProofOfWork {
            previous_hash,
            timestamp,
            merkle_root,
            difficulty,
        }
    }

    fn prepare_data(&self, nonce: u64) -> Result<Vec<u8>> {
        serialize(&HashMessage {
            previous_hash: self.previous_hash,
            timestamp: self.timestamp,
            merkle_root: self.merkle_root,
            nonce,
        })
    }

    pub fn compute_hash(&self, nonce: u64) -> Result<String> {
        let data = self.prepare_data(nonce)?;
        Ok(to_binary_string(&sha256_digest(&data)))
    }

    /// Search nonces from `start_nonce` until the hash meets the difficulty.
    ///
    /// `cancel` is polled before every iteration; when raised the search stops
    /// and reports the nonce it would have tried next.
    pub fn run(&self, start_nonce: u64, cancel: Option<&AtomicBool>) -> Result<PowOutcome> {
        let mut nonce = start_nonce;
        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("Proof-of-work interrupted at nonce {nonce}");
                return Ok(PowOutcome::Interrupted { next_nonce: nonce });
            }

            let hash = self.compute_hash(nonce)?;
            if hash_meets_difficulty(&hash, self.difficulty) {
                return Ok(PowOutcome::Found { nonce, hash });
            }

            nonce = nonce.wrapping_add(1);
            if nonce % PROGRESS_INTERVAL == 0 {
                debug!(
                    "Mining progress: {} nonces tried (difficulty: {})",
                    nonce - start_nonce,
                    self.difficulty
                );
            }
        }
    }
}
