//! Proof-of-work puzzle: find a nonce whose block digest, read as a 256-bit
//! big-endian integer, is strictly below `3 << (256 - target_bits)`.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    constants::{HASH_BITS, HASH_SIZE, MAX_NONCE, MAX_TARGET_BITS, MIN_TARGET_BITS},
    Block, ChainError, Hash, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    target_bits: u32,
    target: Hash,
    max_nonce: u64,
    parallel: bool,
}

impl ProofOfWork {
    pub fn new(target_bits: u32) -> Result<Self> {
        Ok(Self {
            target_bits,
            target: target_from_bits(target_bits)?,
            max_nonce: MAX_NONCE,
            parallel: false,
        })
    }

    /// Caps the nonce search; nonces `0..max_nonce` are tried.
    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    /// Spreads [`ProofOfWork::mine`] across the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn target_bits(&self) -> u32 {
        self.target_bits
    }

    pub fn target(&self) -> &Hash {
        &self.target
    }

    pub(crate) fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    /// Solves the puzzle with whichever strategy this engine is configured for.
    /// Both strategies return the lowest winning nonce.
    pub fn mine(&self, block: &Block) -> Result<(u64, Hash)> {
        if self.parallel {
            self.solve_parallel(block)
        } else {
            self.solve(block)
        }
    }

    /// Sequential search from nonce 0 upward.
    pub fn solve(&self, block: &Block) -> Result<(u64, Hash)> {
        let seeded = seeded_hasher(block);
        for nonce in 0..self.max_nonce {
            let hash = digest_with_nonce(&seeded, nonce);
            if hash < self.target {
                debug!(nonce, hash = %hex::encode(hash), "found proof of work");
                return Ok((nonce, hash));
            }
        }
        Err(ChainError::MiningExhausted {
            attempts: self.max_nonce,
        })
    }

    /// True iff the block was mined at this difficulty, its stored hash is the
    /// digest of its content and nonce, and that digest is below target.
    pub fn validate(&self, block: &Block) -> bool {
        if block.target_bits != self.target_bits {
            return false;
        }
        let hash = digest_with_nonce(&seeded_hasher(block), block.nonce);
        hash == block.hash && hash < self.target
    }
}

/// `3 << (256 - bits)` as a big-endian 256-bit integer.
pub fn target_from_bits(bits: u32) -> Result<Hash> {
    if !(MIN_TARGET_BITS..=MAX_TARGET_BITS).contains(&bits) {
        return Err(ChainError::InvalidDifficulty(bits));
    }
    let shift = (HASH_BITS - bits) as usize;
    let mut target = [0u8; HASH_SIZE];
    for bit in [shift, shift + 1] {
        target[HASH_SIZE - 1 - bit / 8] |= 1 << (bit % 8);
    }
    Ok(target)
}

/// Hasher already fed with the block's header prefix.
pub(crate) fn seeded_hasher(block: &Block) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(block.header_prefix());
    hasher
}

pub(crate) fn digest_with_nonce(seeded: &Sha256, nonce: u64) -> Hash {
    let mut hasher = seeded.clone();
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}
