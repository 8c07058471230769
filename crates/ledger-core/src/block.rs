use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{pow::ProofOfWork, sha256, unix_now, Hash, Result, Transaction};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: u64,
    /// Inclusion order; never reordered.
    pub transactions: Vec<Transaction>,
    /// `None` exactly for the genesis block.
    pub prev_block_hash: Option<Hash>,
    pub hash: Hash,
    pub nonce: u64,
    pub height: u64,
    /// Difficulty the block was mined at.
    pub target_bits: u32,
}

impl Block {
    /// Stamps the current time and mines the block with `pow`.
    pub fn new(
        transactions: Vec<Transaction>,
        prev_block_hash: Option<Hash>,
        height: u64,
        pow: &ProofOfWork,
    ) -> Result<Self> {
        let mut block = Self {
            timestamp: unix_now(),
            transactions,
            prev_block_hash,
            hash: [0u8; 32],
            nonce: 0,
            height,
            target_bits: pow.target_bits(),
        };
        let (nonce, hash) = pow.mine(&block)?;
        block.nonce = nonce;
        block.hash = hash;

        info!(
            height,
            nonce,
            txs = block.transactions.len(),
            hash = %hex::encode(hash),
            "mined block"
        );
        Ok(block)
    }

    pub fn genesis(coinbase: Transaction, pow: &ProofOfWork) -> Result<Self> {
        Self::new(vec![coinbase], None, 0, pow)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }

    /// SHA-256 over the concatenated transaction ids, in inclusion order.
    pub fn transactions_digest(&self) -> Hash {
        let mut ids = Vec::with_capacity(self.transactions.len() * 32);
        for tx in &self.transactions {
            ids.extend_from_slice(&tx.id);
        }
        sha256(&ids)
    }

    /// Every hashed header field except the nonce, in preimage order.
    pub fn header_prefix(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32 + 32 + 8 + 8);
        if let Some(prev) = &self.prev_block_hash {
            bytes.extend_from_slice(prev);
        }
        bytes.extend_from_slice(&self.transactions_digest());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&u64::from(self.target_bits).to_be_bytes());
        bytes
    }

    /// Re-checks the proof of work against the difficulty recorded in the block.
    pub fn verify_pow(&self) -> Result<bool> {
        Ok(ProofOfWork::new(self.target_bits)?.validate(self))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
