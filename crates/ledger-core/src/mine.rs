use crate::{
    pow::{digest_with_nonce, seeded_hasher},
    Block, ChainError, Hash, ProofOfWork, Result,
};
use rayon::prelude::*;
use tracing::debug;

impl ProofOfWork {
    /// Searches nonces in parallel. `find_first` keeps the answer identical to
    /// the sequential [`ProofOfWork::solve`]: the lowest nonce below target.
    pub fn solve_parallel(&self, block: &Block) -> Result<(u64, Hash)> {
        let seeded = seeded_hasher(block);
        let target = *self.target();

        let found = (0u64..self.max_nonce())
            .into_par_iter()
            .map(|nonce| (nonce, digest_with_nonce(&seeded, nonce)))
            .find_first(|(_, hash)| *hash < target);

        match found {
            Some((nonce, hash)) => {
                debug!(nonce, hash = %hex::encode(hash), "found proof of work in parallel");
                Ok((nonce, hash))
            }
            None => Err(ChainError::MiningExhausted {
                attempts: self.max_nonce(),
            }),
        }
    }
}
