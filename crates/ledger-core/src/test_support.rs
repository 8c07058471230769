//! In-memory [`ChainStore`] double with fault injection.

use std::{
    collections::HashMap,
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::{chain::ChainStore, Block, ChainError, Hash, Result};

#[derive(Default)]
struct Inner {
    tip: Option<Hash>,
    blocks: HashMap<Hash, Vec<u8>>,
}

#[derive(Default)]
pub(crate) struct MemStore {
    inner: Mutex<Inner>,
    failing: AtomicBool,
    racing: AtomicBool,
    commits: AtomicUsize,
}

impl MemStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Number of stored blocks.
    pub(crate) fn len(&self) -> usize {
        self.lock().blocks.len()
    }

    /// Stores a block under its own hash without touching the tip.
    pub(crate) fn insert_raw(&self, block: &Block) {
        self.insert_raw_at(block.hash, block);
    }

    pub(crate) fn insert_raw_at(&self, key: Hash, block: &Block) {
        self.lock().blocks.insert(key, block.serialize().unwrap());
    }

    /// Every commit fails with a storage error.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every commit behaves as if another writer had just moved the tip.
    pub(crate) fn set_racing(&self, racing: bool) {
        self.racing.store(racing, Ordering::SeqCst);
    }

    pub(crate) fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl ChainStore for MemStore {
    fn tip(&self) -> Result<Option<Hash>> {
        Ok(self.lock().tip)
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.lock()
            .blocks
            .get(hash)
            .map(|bytes| Block::deserialize(bytes))
            .transpose()
    }

    fn commit_block(&self, block: &Block) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::storage(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        let mut inner = self.lock();
        if self.racing.load(Ordering::SeqCst) || inner.tip != block.prev_block_hash {
            return Err(ChainError::TipMoved {
                expected: block.prev_block_hash,
            });
        }
        inner.blocks.insert(block.hash, block.serialize()?);
        inner.tip = Some(block.hash);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
