use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use vx_types::{
    BlockContents, BlockHash, BlockHeader, ChainId, Genesis, HistoryMode, Operation, OperationHash,
    ProtocolHash,
};

use crate::schema::*;
use crate::traits::kv_store::KVStoreRead;

pub(crate) fn indexed_key(hash: &BlockHash, index: u8) -> Vec<u8> {
    let mut key = hash.as_slice().to_vec();
    key.push(index);
    key
}

fn decode<T: serde::de::DeserializeOwned>(slice: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(slice)?)
}

pub trait ChainStore: KVStoreRead {
    fn get_block_header(&self, hash: &BlockHash) -> Result<Option<BlockHeader>> {
        match self.get(COLUMN_BLOCK_HEADER, hash.as_slice()) {
            Some(slice) => Ok(Some(decode(&slice)?)),
            None => Ok(None),
        }
    }

    fn get_block_contents(&self, hash: &BlockHash) -> Result<Option<BlockContents>> {
        match self.get(COLUMN_BLOCK_CONTENTS, hash.as_slice()) {
            Some(slice) => Ok(Some(decode(&slice)?)),
            None => Ok(None),
        }
    }

    fn has_block_contents(&self, hash: &BlockHash) -> bool {
        self.get(COLUMN_BLOCK_CONTENTS, hash.as_slice()).is_some()
    }

    fn get_operations(&self, hash: &BlockHash, pass: u8) -> Result<Option<Vec<Operation>>> {
        match self.get(COLUMN_OPERATIONS, &indexed_key(hash, pass)) {
            Some(slice) => Ok(Some(decode(&slice)?)),
            None => Ok(None),
        }
    }

    /// All operation passes of a block, highest pass first. `None` when any
    /// pass has been pruned away.
    fn get_operations_bindings(
        &self,
        hash: &BlockHash,
        validation_passes: u8,
    ) -> Result<Option<Vec<(u8, Vec<Operation>)>>> {
        let mut bindings = Vec::with_capacity(validation_passes as usize);
        for pass in (0..validation_passes).rev() {
            match self.get_operations(hash, pass)? {
                Some(ops) => bindings.push((pass, ops)),
                None => return Ok(None),
            }
        }
        Ok(Some(bindings))
    }

    fn get_operation_hashes(&self, hash: &BlockHash, pass: u8) -> Result<Option<Vec<OperationHash>>> {
        match self.get(COLUMN_OPERATION_HASHES, &indexed_key(hash, pass)) {
            Some(slice) => Ok(Some(decode(&slice)?)),
            None => Ok(None),
        }
    }

    /// All operation-hash passes of a block, highest pass first.
    fn get_operation_hashes_bindings(
        &self,
        hash: &BlockHash,
        validation_passes: u8,
    ) -> Result<Option<Vec<(u8, Vec<OperationHash>)>>> {
        let mut bindings = Vec::with_capacity(validation_passes as usize);
        for pass in (0..validation_passes).rev() {
            match self.get_operation_hashes(hash, pass)? {
                Some(hashes) => bindings.push((pass, hashes)),
                None => return Ok(None),
            }
        }
        Ok(Some(bindings))
    }

    fn get_predecessor(&self, hash: &BlockHash, rank: u8) -> Result<Option<BlockHash>> {
        match self.get(COLUMN_PREDECESSORS, &indexed_key(hash, rank)) {
            Some(slice) => Ok(Some(BlockHash::from_slice(&slice)?)),
            None => Ok(None),
        }
    }

    /// Ancestor `distance` levels below `hash`, resolved through the
    /// skip-list in O(log distance) hops.
    fn get_ancestor(&self, hash: &BlockHash, distance: u32) -> Result<Option<BlockHash>> {
        let mut current = *hash;
        let mut remaining = distance;
        while remaining > 0 {
            let rank = 31 - remaining.leading_zeros();
            match self.get_predecessor(&current, rank as u8)? {
                Some(ancestor) => current = ancestor,
                None => return Ok(None),
            }
            remaining -= 1 << rank;
        }
        Ok(Some(current))
    }

    fn get_in_main_branch(&self, predecessor: &BlockHash) -> Result<Option<BlockHash>> {
        match self.get(COLUMN_IN_MAIN_BRANCH, predecessor.as_slice()) {
            Some(slice) => Ok(Some(BlockHash::from_slice(&slice)?)),
            None => Ok(None),
        }
    }

    fn get_protocol(&self, proto_level: u8) -> Result<Option<ProtocolHash>> {
        match self.get(COLUMN_PROTOCOL, &[proto_level]) {
            Some(slice) => Ok(Some(ProtocolHash::from_slice(&slice)?)),
            None => Ok(None),
        }
    }

    fn get_current_head(&self) -> Result<Option<BlockHash>> {
        match self.get(COLUMN_META, META_CURRENT_HEAD_KEY) {
            Some(slice) => Ok(Some(BlockHash::from_slice(&slice)?)),
            None => Ok(None),
        }
    }

    fn get_known_heads(&self) -> Result<BTreeSet<BlockHash>> {
        match self.get(COLUMN_META, META_KNOWN_HEADS_KEY) {
            Some(slice) => decode(&slice),
            None => Ok(BTreeSet::new()),
        }
    }

    fn get_checkpoint(&self) -> Result<BlockHeader> {
        let slice = self
            .get(COLUMN_META, META_CHECKPOINT_KEY)
            .ok_or_else(|| anyhow!("checkpoint not initialized"))?;
        decode(&slice)
    }

    fn get_save_point(&self) -> Result<(i32, BlockHash)> {
        let slice = self
            .get(COLUMN_META, META_SAVE_POINT_KEY)
            .ok_or_else(|| anyhow!("save point not initialized"))?;
        decode(&slice)
    }

    fn get_caboose(&self) -> Result<(i32, BlockHash)> {
        let slice = self
            .get(COLUMN_META, META_CABOOSE_KEY)
            .ok_or_else(|| anyhow!("caboose not initialized"))?;
        decode(&slice)
    }

    fn get_history_mode(&self) -> Result<Option<HistoryMode>> {
        match self.get(COLUMN_META, META_HISTORY_MODE_KEY) {
            Some(slice) => Ok(Some(decode(&slice)?)),
            None => Ok(None),
        }
    }

    fn get_chain_id(&self) -> Result<ChainId> {
        let slice = self
            .get(COLUMN_META, META_CHAIN_ID_KEY)
            .ok_or_else(|| anyhow!("chain id not initialized"))?;
        decode(&slice)
    }

    fn get_genesis(&self) -> Result<Genesis> {
        let slice = self
            .get(COLUMN_META, META_GENESIS_KEY)
            .ok_or_else(|| anyhow!("genesis not initialized"))?;
        decode(&slice)
    }
}

impl<T: ChainStore> ChainStore for &T {}
impl<T: ChainStore> ChainStore for &mut T {}
