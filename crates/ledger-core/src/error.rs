use crate::Hash;
use thiserror::Error;

pub type Result<T, E = ChainError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure a chain operation can surface to its caller.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("nonce space exhausted after {attempts} attempts")]
    MiningExhausted { attempts: u64 },

    #[error("block {} failed validation: {reason}", hex::encode(.hash))]
    ValidationFailure { hash: Hash, reason: String },

    #[error("difficulty of {0} bits is outside the supported range")]
    InvalidDifficulty(u32),

    #[error("block {} is referenced but not stored", hex::encode(.0))]
    MissingBlock(Hash),

    #[error("no existing blockchain found, create one first")]
    ChainNotFound,

    #[error("tip pointer holds {0} bytes instead of a block hash")]
    CorruptTip(usize),

    #[error("tip moved away from {} while the block was being mined", describe_tip(.expected))]
    TipMoved { expected: Option<Hash> },

    #[error("coinbase transaction {} is only allowed in the genesis block", hex::encode(.0))]
    CoinbaseOutsideGenesis(Hash),

    #[error("'{address}' holds {available}, {required} required")]
    InsufficientFunds {
        address: String,
        available: u64,
        required: u64,
    },

    #[error("unspent outputs of '{address}' add up to more than u64::MAX")]
    ValueOverflow { address: String },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

impl ChainError {
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }

    pub(crate) fn validation(hash: Hash, reason: impl Into<String>) -> Self {
        Self::ValidationFailure {
            hash,
            reason: reason.into(),
        }
    }
}

fn describe_tip(tip: &Option<Hash>) -> String {
    match tip {
        Some(hash) => hex::encode(hash),
        None => "<empty chain>".to_string(),
    }
}
