//! Batched atomic write scope.
//!
//! A transaction buffers writes in a `WriteBatch` and an overlay map so
//! reads observe pending writes. `commit` hands the whole batch to the
//! engine atomically. The store assumes a single writer; bulk callers
//! bound the batch size by committing and opening a fresh scope.

use std::collections::BTreeSet;
use std::collections::HashMap;

use anyhow::Result;
use rocksdb::WriteBatch;
use vx_types::{
    BlockContents, BlockHash, BlockHeader, ChainId, Genesis, HistoryMode, Operation, OperationHash,
    ProtocolHash,
};

use crate::schema::*;
use crate::store_impl::Store;
use crate::traits::chain_store::{indexed_key, ChainStore};
use crate::traits::kv_store::{KVStore, KVStoreRead, KVStoreWrite};

pub struct StoreTransaction<'a> {
    store: &'a Store,
    batch: WriteBatch,
    overlay: HashMap<(Col, Vec<u8>), Option<Vec<u8>>>,
}

impl<'a> StoreTransaction<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        StoreTransaction {
            store,
            batch: WriteBatch::default(),
            overlay: HashMap::new(),
        }
    }

    pub fn commit(self) -> Result<()> {
        self.store.write(self.batch)
    }

    fn insert<T: serde::Serialize>(&mut self, col: Col, key: &[u8], value: &T) -> Result<()> {
        let encoded = bincode::serialize(value)?;
        self.insert_raw(col, key, &encoded)
    }

    pub fn insert_block_header(&mut self, hash: &BlockHash, header: &BlockHeader) -> Result<()> {
        self.insert(COLUMN_BLOCK_HEADER, hash.as_slice(), header)
    }

    pub fn insert_block_contents(
        &mut self,
        hash: &BlockHash,
        contents: &BlockContents,
    ) -> Result<()> {
        self.insert(COLUMN_BLOCK_CONTENTS, hash.as_slice(), contents)
    }

    pub fn insert_operations(
        &mut self,
        hash: &BlockHash,
        pass: u8,
        operations: &[Operation],
    ) -> Result<()> {
        self.insert(COLUMN_OPERATIONS, &indexed_key(hash, pass), &operations)
    }

    pub fn insert_operation_hashes(
        &mut self,
        hash: &BlockHash,
        pass: u8,
        hashes: &[OperationHash],
    ) -> Result<()> {
        self.insert(COLUMN_OPERATION_HASHES, &indexed_key(hash, pass), &hashes)
    }

    pub fn insert_operations_metadata(
        &mut self,
        hash: &BlockHash,
        pass: u8,
        metadata: &[Vec<u8>],
    ) -> Result<()> {
        self.insert(
            COLUMN_OPERATIONS_METADATA,
            &indexed_key(hash, pass),
            &metadata,
        )
    }

    pub fn insert_predecessor(
        &mut self,
        hash: &BlockHash,
        rank: u8,
        predecessor: &BlockHash,
    ) -> Result<()> {
        self.insert_raw(
            COLUMN_PREDECESSORS,
            &indexed_key(hash, rank),
            predecessor.as_slice(),
        )
    }

    pub fn insert_in_main_branch(
        &mut self,
        predecessor: &BlockHash,
        successor: &BlockHash,
    ) -> Result<()> {
        self.insert_raw(
            COLUMN_IN_MAIN_BRANCH,
            predecessor.as_slice(),
            successor.as_slice(),
        )
    }

    pub fn set_protocol(&mut self, proto_level: u8, protocol: &ProtocolHash) -> Result<()> {
        self.insert_raw(COLUMN_PROTOCOL, &[proto_level], protocol.as_slice())
    }

    pub fn set_current_head(&mut self, hash: &BlockHash) -> Result<()> {
        self.insert_raw(COLUMN_META, META_CURRENT_HEAD_KEY, hash.as_slice())
    }

    pub fn set_known_heads(&mut self, heads: &BTreeSet<BlockHash>) -> Result<()> {
        self.insert(COLUMN_META, META_KNOWN_HEADS_KEY, heads)
    }

    pub fn set_checkpoint(&mut self, header: &BlockHeader) -> Result<()> {
        self.insert(COLUMN_META, META_CHECKPOINT_KEY, header)
    }

    pub fn set_save_point(&mut self, level: i32, hash: &BlockHash) -> Result<()> {
        self.insert(COLUMN_META, META_SAVE_POINT_KEY, &(level, hash))
    }

    pub fn set_caboose(&mut self, level: i32, hash: &BlockHash) -> Result<()> {
        self.insert(COLUMN_META, META_CABOOSE_KEY, &(level, hash))
    }

    pub fn set_history_mode(&mut self, mode: HistoryMode) -> Result<()> {
        self.insert(COLUMN_META, META_HISTORY_MODE_KEY, &mode)
    }

    pub fn set_chain_id(&mut self, chain_id: &ChainId) -> Result<()> {
        self.insert(COLUMN_META, META_CHAIN_ID_KEY, chain_id)
    }

    pub fn set_genesis(&mut self, genesis: &Genesis) -> Result<()> {
        self.insert(COLUMN_META, META_GENESIS_KEY, genesis)
    }
}

impl ChainStore for StoreTransaction<'_> {}

impl KVStoreRead for StoreTransaction<'_> {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>> {
        match self.overlay.get(&(col, key.to_vec())) {
            Some(Some(value)) => Some(value.clone().into_boxed_slice()),
            Some(None) => None,
            None => self.store.get(col, key),
        }
    }
}

impl KVStoreWrite for StoreTransaction<'_> {
    fn insert_raw(&mut self, col: Col, key: &[u8], value: &[u8]) -> Result<()> {
        self.batch.put_cf(self.store.cf(col), key, value);
        self.overlay
            .insert((col, key.to_vec()), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, col: Col, key: &[u8]) -> Result<()> {
        self.batch.delete_cf(self.store.cf(col), key);
        self.overlay.insert((col, key.to_vec()), None);
        Ok(())
    }
}

impl KVStore for StoreTransaction<'_> {}
