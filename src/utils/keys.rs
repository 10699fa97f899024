use crate::error::Result;
use crate::utils::{
    base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair,
    public_key_from_pkcs8, ripemd160_digest, sha256_digest,
};
use std::fmt;
use zeroize::ZeroizeOnDrop;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// An identity on the ledger: the raw public key bytes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> PublicKey {
        PublicKey(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn verify(&self, signature: &[u8], message: &[u8]) -> bool {
        ecdsa_p256_sha256_sign_verify(self.as_bytes(), signature, message)
    }

    /// Base58check address, used to name identities in diagnostics
    pub fn address(&self) -> String {
        let pub_key_hash = hash_pub_key(self.as_bytes());
        let mut payload: Vec<u8> = vec![VERSION];
        payload.extend(pub_key_hash.as_slice());
        let checksum = checksum(payload.as_slice());
        payload.extend(checksum.as_slice());
        base58_encode(payload.as_slice())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.address())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// PKCS#8 private key material, wiped on drop
#[derive(Clone, ZeroizeOnDrop)]
struct SecretKey {
    pkcs8: Vec<u8>,
}

/// ECDSA P-256 key pair
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let pkcs8 = new_key_pair()?;
        KeyPair::from_pkcs8(&pkcs8)
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<KeyPair> {
        let public_key = public_key_from_pkcs8(pkcs8)?;
        Ok(KeyPair {
            secret: SecretKey {
                pkcs8: pkcs8.to_vec(),
            },
            public_key: PublicKey(public_key),
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.secret.pkcs8.as_slice()
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        ecdsa_p256_sha256_sign_digest(self.get_pkcs8(), message)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}
