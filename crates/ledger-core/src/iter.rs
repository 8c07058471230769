use std::sync::Arc;

use crate::{chain::ChainStore, Block, ChainError, Hash, Result};

/// Walks the chain from a starting hash back to genesis, loading one block
/// per step. Not restartable: ask the [`crate::Blockchain`] for a fresh one.
pub struct ChainIterator<S: ChainStore + ?Sized> {
    current_hash: Option<Hash>,
    store: Arc<S>,
}

impl<S: ChainStore + ?Sized> ChainIterator<S> {
    pub fn new(start: Hash, store: Arc<S>) -> Self {
        Self {
            current_hash: Some(start),
            store,
        }
    }

    /// Hash of the block the next call will load, if any.
    pub fn current_hash(&self) -> Option<&Hash> {
        self.current_hash.as_ref()
    }
}

impl<S: ChainStore + ?Sized> Iterator for ChainIterator<S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        // Taking the cursor first ends the walk after genesis or any error.
        let hash = self.current_hash.take()?;
        match self.store.get_block(&hash) {
            Ok(Some(block)) => {
                self.current_hash = block.prev_block_hash;
                Some(Ok(block))
            }
            Ok(None) => Some(Err(ChainError::MissingBlock(hash))),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_support::MemStore, ProofOfWork, Transaction};

    #[test]
    fn walks_back_to_genesis_then_stops() {
        let pow = ProofOfWork::new(8).unwrap();
        let store = Arc::new(MemStore::default());
        let genesis = Block::genesis(Transaction::coinbase("alice").unwrap(), &pow).unwrap();
        let next = Block::new(vec![], Some(genesis.hash), 1, &pow).unwrap();
        store.insert_raw(&genesis);
        store.insert_raw(&next);

        let mut it = ChainIterator::new(next.hash, store);
        assert_eq!(it.current_hash(), Some(&next.hash));
        assert_eq!(it.next().unwrap().unwrap(), next);
        assert_eq!(it.current_hash(), Some(&genesis.hash));
        assert_eq!(it.next().unwrap().unwrap(), genesis);
        assert!(it.current_hash().is_none());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn missing_block_is_reported_once() {
        let store = Arc::new(MemStore::default());
        let mut it = ChainIterator::new([7u8; 32], store);
        assert!(matches!(it.next(), Some(Err(ChainError::MissingBlock(h))) if h == [7u8; 32]));
        assert!(it.next().is_none());
    }
}
