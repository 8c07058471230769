//! Consensus and storage core of a single-node proof-of-work ledger.
//!
//! Blocks commit to their transactions and predecessor through a SHA-256
//! preimage, are admitted by a proof-of-work search, and are appended to a
//! [`chain::Blockchain`] whose persistence is delegated to a
//! [`chain::ChainStore`]. Balances are derived by rescanning the chain for
//! unspent transaction outputs.

pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod iter;
mod mine;
pub mod pow;
pub mod transaction;
pub mod utxo;

#[cfg(test)]
pub(crate) mod test_support;

use sha2::{Digest, Sha256};

pub use block::Block;
pub use chain::{Blockchain, ChainConfig, ChainStore};
pub use error::{ChainError, Result};
pub use iter::ChainIterator;
pub use pow::ProofOfWork;
pub use transaction::{LockPolicy, PlainAddress, Transaction, TxInput, TxOutput};

pub type Hash = [u8; 32];

pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Current UNIX time in whole seconds; a clock before the epoch reads as 0.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
