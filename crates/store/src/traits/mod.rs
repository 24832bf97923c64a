pub mod chain_store;
pub mod kv_store;

pub use chain_store::ChainStore;
pub use kv_store::{KVStore, KVStoreRead, KVStoreWrite};
