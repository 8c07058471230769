//! Storage backends implementing [`ledger_core::ChainStore`].

pub mod sled_store;

pub use sled_store::SledStore;
