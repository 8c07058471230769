use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    constants::{MAX_APPEND_ATTEMPTS, TARGET_BITS},
    utxo::{self, UnspentTransaction},
    Block, ChainError, ChainIterator, Hash, LockPolicy, PlainAddress, ProofOfWork, Result,
    Transaction, TxOutput,
};

/// Persistence the chain needs: a bucket of block hash -> serialized block,
/// plus a tip pointer, with atomic multi-key writes.
///
/// This lives in `ledger-core` to avoid a circular dependency with the
/// storage backends.
pub trait ChainStore: Send + Sync {
    /// Hash of the most recently committed block, `None` for an empty store.
    fn tip(&self) -> Result<Option<Hash>>;

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>>;

    /// Stores `block` under its hash and moves the tip to it in one write
    /// transaction, but only while the tip still equals
    /// `block.prev_block_hash` (no tip at all, for a genesis block).
    /// Otherwise nothing is written and [`ChainError::TipMoved`] is returned.
    fn commit_block(&self, block: &Block) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub target_bits: u32,
    pub parallel_mining: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            target_bits: TARGET_BITS,
            parallel_mining: false,
        }
    }
}

impl ChainConfig {
    fn proof_of_work(&self) -> Result<ProofOfWork> {
        Ok(ProofOfWork::new(self.target_bits)?.with_parallel(self.parallel_mining))
    }
}

/// Owned handle on a persisted chain.
pub struct Blockchain<S: ChainStore + ?Sized> {
    tip: Hash,
    store: Arc<S>,
    pow: ProofOfWork,
    policy: Arc<dyn LockPolicy>,
}

impl<S: ChainStore + ?Sized> Blockchain<S> {
    /// Opens the chain in `store`, creating it with a genesis coinbase paying
    /// `address` when the store is empty. An existing chain is loaded as is.
    pub fn open(store: Arc<S>, address: &str, config: ChainConfig) -> Result<Self> {
        let pow = config.proof_of_work()?;
        if let Some(tip) = store.tip()? {
            debug!(tip = %hex::encode(tip), "found existing chain");
            return Ok(Self::from_parts(tip, store, pow));
        }

        let genesis = Block::genesis(Transaction::coinbase(address)?, &pow)?;
        let tip = match store.commit_block(&genesis) {
            Ok(()) => {
                info!(hash = %hex::encode(genesis.hash), %address, "created genesis block");
                genesis.hash
            }
            // Someone else initialized the store while we were mining.
            Err(ChainError::TipMoved { .. }) => {
                warn!("chain was initialized concurrently, discarding our genesis block");
                store.tip()?.ok_or(ChainError::ChainNotFound)?
            }
            Err(e) => return Err(e),
        };
        Ok(Self::from_parts(tip, store, pow))
    }

    /// Opens an existing chain; [`ChainError::ChainNotFound`] if the store is empty.
    pub fn load(store: Arc<S>, config: ChainConfig) -> Result<Self> {
        let pow = config.proof_of_work()?;
        let tip = store.tip()?.ok_or(ChainError::ChainNotFound)?;
        Ok(Self::from_parts(tip, store, pow))
    }

    fn from_parts(tip: Hash, store: Arc<S>, pow: ProofOfWork) -> Self {
        Self {
            tip,
            store,
            pow,
            policy: Arc::new(PlainAddress),
        }
    }

    /// Replaces the ownership rule used by balance and spend queries.
    pub fn with_policy(mut self, policy: Arc<dyn LockPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Tip this handle last loaded or appended. Queries read the stored tip
    /// instead, so they see blocks appended through other handles.
    pub fn tip(&self) -> Hash {
        self.tip
    }

    fn stored_tip(&self) -> Result<Hash> {
        self.store.tip()?.ok_or(ChainError::ChainNotFound)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.store.get_block(hash)
    }

    pub fn height(&self) -> Result<u64> {
        let tip = self.stored_tip()?;
        let block = self
            .store
            .get_block(&tip)?
            .ok_or(ChainError::MissingBlock(tip))?;
        Ok(block.height)
    }

    /// Mines a block with `transactions` on top of the stored tip and commits it.
    ///
    /// If another writer moved the tip while we were mining, the block is
    /// rebuilt against the new tip, up to [`MAX_APPEND_ATTEMPTS`] times.
    pub fn append(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        if let Some(tx) = transactions.iter().find(|tx| tx.is_coinbase()) {
            return Err(ChainError::CoinbaseOutsideGenesis(tx.id));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let tip = self.stored_tip()?;
            let parent = self
                .store
                .get_block(&tip)?
                .ok_or(ChainError::MissingBlock(tip))?;

            let block = Block::new(transactions.clone(), Some(tip), parent.height + 1, &self.pow)?;
            match self.store.commit_block(&block) {
                Ok(()) => {
                    self.tip = block.hash;
                    info!(height = block.height, hash = %hex::encode(block.hash), "appended block");
                    return Ok(block);
                }
                Err(ChainError::TipMoved { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
                    warn!(attempt, "tip moved while mining, rebuilding on the new tip");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Builds a transfer from `from`'s unspent outputs and appends it in its own block.
    pub fn send(&mut self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let (available, spendable) = self.find_spendable_outputs(from, amount)?;
        let tx = Transaction::transfer(from, to, amount, available, &spendable)?;
        debug!(txid = %hex::encode(tx.id), %from, %to, amount, "built transfer");
        self.append(vec![tx])
    }

    /// Iterator positioned at the tip currently in the store.
    pub fn iterator(&self) -> Result<ChainIterator<S>> {
        Ok(ChainIterator::new(self.stored_tip()?, Arc::clone(&self.store)))
    }

    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<UnspentTransaction>> {
        utxo::find_unspent_transactions(self.iterator()?, self.policy.as_ref(), address)
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        utxo::find_utxo(self.iterator()?, self.policy.as_ref(), address)
    }

    pub fn balance(&self, address: &str) -> Result<u64> {
        utxo::balance(self.iterator()?, self.policy.as_ref(), address)
    }

    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, BTreeMap<Hash, Vec<u32>>)> {
        utxo::find_spendable_outputs(self.iterator()?, self.policy.as_ref(), address, amount)
    }

    /// Audits every stored block from tip to genesis: proof of work,
    /// transaction ids, hash links and heights. Returns the number of blocks.
    pub fn verify(&self) -> Result<u64> {
        let blocks = self.iterator()?;
        let mut expected = blocks.current_hash().map(|tip| (*tip, None::<u64>));
        let mut checked = 0u64;

        for block in blocks {
            let block = block?;
            let Some((hash, child_height)) = expected else {
                break;
            };
            if block.hash != hash {
                return Err(ChainError::validation(block.hash, "stored under a different hash"));
            }
            if !block.verify_pow()? {
                return Err(ChainError::validation(block.hash, "proof of work does not hold"));
            }
            if let Some(child_height) = child_height {
                if block.height + 1 != child_height {
                    return Err(ChainError::validation(
                        block.hash,
                        format!("height {} below a block at height {child_height}", block.height),
                    ));
                }
            }
            for tx in &block.transactions {
                if !tx.has_valid_id()? {
                    return Err(ChainError::validation(
                        block.hash,
                        format!("transaction {} does not match its id", hex::encode(tx.id)),
                    ));
                }
                if tx.is_coinbase() && !block.is_genesis() {
                    return Err(ChainError::validation(block.hash, "coinbase outside genesis"));
                }
            }
            if block.is_genesis() && block.height != 0 {
                return Err(ChainError::validation(block.hash, "genesis block with non-zero height"));
            }

            checked += 1;
            expected = block.prev_block_hash.map(|prev| (prev, Some(block.height)));
        }

        debug!(blocks = checked, "chain verified");
        Ok(checked)
    }

    /// Flushes the store; the handle is consumed.
    pub fn close(self) -> Result<()> {
        self.store.flush()
    }
}
