#![allow(dead_code)]

use std::{fmt::Debug, fs, path::Path, sync::Arc, thread, time::Duration};

use ledger_core::{Block, ChainConfig, ProofOfWork, Transaction};
use ledger_storage::SledStore;
use tempfile::{tempdir, TempDir};

/// Low difficulty so tests mine in milliseconds.
pub const TEST_BITS: u32 = 8;

pub fn test_config() -> ChainConfig {
    ChainConfig {
        target_bits: TEST_BITS,
        parallel_mining: false,
    }
}

pub fn test_pow() -> ProofOfWork {
    ProofOfWork::new(TEST_BITS).expect("valid difficulty")
}

pub fn create_temp_store() -> (TempDir, Arc<SledStore>) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = SledStore::open(temp_dir.path()).expect("Failed to open SledStore");
    (temp_dir, Arc::new(store))
}

/// Sled releases its file lock only once its background flusher lets go of
/// the database, which can trail the last handle being dropped.
pub fn retry_open<T, E: Debug>(mut open: impl FnMut() -> Result<T, E>) -> T {
    let mut attempt = 0;
    loop {
        match open() {
            Ok(value) => return value,
            Err(e) if attempt < 50 => {
                attempt += 1;
                eprintln!("open attempt {attempt} failed: {e:?}, retrying");
                thread::sleep(Duration::from_millis(20));
            }
            Err(e) => panic!("Failed to reopen database: {e:?}"),
        }
    }
}

pub fn reopen_store(path: &Path) -> SledStore {
    retry_open(|| SledStore::open(path))
}

pub fn reopen_raw(path: &Path) -> sled::Db {
    retry_open(|| sled::open(path))
}

pub fn mined_genesis(address: &str) -> Block {
    Block::genesis(Transaction::coinbase(address).unwrap(), &test_pow()).unwrap()
}

/// Mines a child of `parent`; distinct `payload`s give distinct siblings.
pub fn mined_child_with(parent: &Block, payload: Vec<Transaction>) -> Block {
    Block::new(payload, Some(parent.hash), parent.height + 1, &test_pow()).unwrap()
}

pub fn mined_child(parent: &Block) -> Block {
    Block::new(vec![], Some(parent.hash), parent.height + 1, &test_pow()).unwrap()
}

pub fn teardown_store(temp_dir: TempDir, store: Arc<SledStore>) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    // Verify the directory is removed
    assert!(!db_path.exists(), "Database directory should be removed");
}
