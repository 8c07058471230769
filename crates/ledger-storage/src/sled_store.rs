use ledger_core::{Block, ChainError, ChainStore, Hash, Result};
use sled::{
  transaction::{ConflictableTransactionError, TransactionError, TransactionResult},
  Db, Tree,
};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";
/// Reserved key holding the tip hash; every other key is a block hash.
pub const KEY_TIP: &[u8] = b"l";

#[derive(Clone)]
pub struct SledStore {
  db: Db,
  blocks: Tree,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).map_err(ChainError::storage)?;
    let blocks = db.open_tree(TREE_BLOCKS).map_err(ChainError::storage)?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db, blocks })
  }

  /// Removes every block and the tip pointer.
  pub fn clear(&self) -> Result<()> {
    self.blocks.clear().map_err(ChainError::storage)?;
    self.flush()
  }

  /// Number of stored blocks, not counting the tip pointer.
  pub fn block_count(&self) -> Result<usize> {
    let tip = self.blocks.contains_key(KEY_TIP).map_err(ChainError::storage)?;
    Ok(self.blocks.len() - usize::from(tip))
  }
}

fn decode_tip(bytes: &[u8]) -> Result<Hash> {
  Hash::try_from(bytes).map_err(|_| ChainError::CorruptTip(bytes.len()))
}

impl ChainStore for SledStore {
  fn tip(&self) -> Result<Option<Hash>> {
    self
      .blocks
      .get(KEY_TIP)
      .map_err(ChainError::storage)?
      .map(|v| decode_tip(&v))
      .transpose()
  }

  fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
    self
      .blocks
      .get(hash)
      .map_err(ChainError::storage)?
      .map(|v| Block::deserialize(&v))
      .transpose()
  }

  fn commit_block(&self, block: &Block) -> Result<()> {
    let bytes = block.serialize()?;

    // sled serializes write transactions, so the tip check and both inserts
    // land together or not at all.
    let result: TransactionResult<(), ChainError> = self.blocks.transaction(|tx| {
      let current = match tx.get(KEY_TIP)? {
        Some(v) => Some(decode_tip(&v).map_err(ConflictableTransactionError::Abort)?),
        None => None,
      };
      if current != block.prev_block_hash {
        return Err(ConflictableTransactionError::Abort(ChainError::TipMoved {
          expected: block.prev_block_hash,
        }));
      }
      tx.insert(&block.hash[..], bytes.as_slice())?;
      tx.insert(KEY_TIP, &block.hash[..])?;
      Ok(())
    });

    match result {
      Ok(()) => {
        debug!(height = block.height, bytes = bytes.len(), "committed block");
        Ok(())
      }
      Err(TransactionError::Abort(e)) => Err(e),
      Err(TransactionError::Storage(e)) => Err(ChainError::storage(e)),
    }
  }

  fn flush(&self) -> Result<()> {
    self.db.flush().map_err(ChainError::storage)?;
    Ok(())
  }
}
