//! Utility functions and helpers
//!
//! This module adapts the digest and signature capabilities the ledger
//! consumes, plus key handling, timestamps and canonical encoding.

pub mod crypto;
pub mod keys;
pub mod serialization;

pub use crypto::{
    base58_encode, current_timestamp, digest_to_id, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, next_sequence, public_key_from_pkcs8,
    ripemd160_digest, sha256_digest,
};
pub use keys::{hash_pub_key, KeyPair, PublicKey, ADDRESS_CHECK_SUM_LEN};
pub use serialization::serialize;
