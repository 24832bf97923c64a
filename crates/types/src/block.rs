//! Block model.
//!
//! A header commits to its operations through `operations_hash`, to its
//! predecessor through `predecessor` and to the post-application state
//! through `context`. Hashes are computed over the bincode encoding, which
//! is canonical for these types.

use serde::{Deserialize, Serialize};
use vx_hash::blake2b::blake2b_256;

use crate::hash::{BlockHash, ContextHash, OperationHash, OperationListHash, OperationListListHash};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// 1 for the block directly after genesis; genesis is level 0.
    pub level: i32,
    pub predecessor: BlockHash,
    pub timestamp: i64,
    /// Protocol epoch counter; increments at protocol transitions.
    pub proto_level: u8,
    /// Number of operation lists.
    pub validation_passes: u8,
    /// Merkle root over operation lists, lowest pass first.
    pub operations_hash: OperationListListHash,
    pub fitness: Vec<Vec<u8>>,
    /// Commitment to the state after applying this block.
    pub context: ContextHash,
    pub protocol_data: Vec<u8>,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockHash {
        let bytes = bincode::serialize(self).expect("serialize block header");
        blake2b_256(bytes).into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// The block this operation was branched on.
    pub branch: BlockHash,
    pub data: Vec<u8>,
}

impl Operation {
    pub fn hash(&self) -> OperationHash {
        let bytes = bincode::serialize(self).expect("serialize operation");
        blake2b_256(bytes).into()
    }
}

/// Merkle root over full operation lists, lowest pass first.
pub fn operations_merkle_root(operations: &[Vec<Operation>]) -> OperationListListHash {
    let roots: Vec<OperationListHash> = operations
        .iter()
        .map(|ops| {
            let hashes: Vec<OperationHash> = ops.iter().map(Operation::hash).collect();
            OperationListHash::compute(&hashes)
        })
        .collect();
    OperationListListHash::compute(&roots)
}

/// A history entry carried in snapshots: header plus operations and their
/// hashes, without metadata or context.
///
/// Pass lists are carried highest pass first, the order the store bindings
/// return them in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedBlock {
    pub block_header: BlockHeader,
    pub operations: Vec<(u8, Vec<Operation>)>,
    pub operation_hashes: Vec<(u8, Vec<OperationHash>)>,
}

impl PrunedBlock {
    pub fn level(&self) -> i32 {
        self.block_header.level
    }

    /// Operation lists in application order, lowest pass first.
    pub fn operations_in_order(&self) -> Vec<Vec<Operation>> {
        let mut passes: Vec<_> = self.operations.iter().collect();
        passes.sort_by_key(|(pass, _)| *pass);
        passes.into_iter().map(|(_, ops)| ops.clone()).collect()
    }
}

/// The head block of a snapshot, carried with its full operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    pub block_header: BlockHeader,
    /// Lowest pass first.
    pub operations: Vec<Vec<Operation>>,
}

/// Validation record of a locally applied block. Pruned blocks have none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContents {
    pub context: ContextHash,
    pub message: Option<String>,
    pub max_operations_ttl: i32,
    pub last_allowed_fork_level: i32,
    pub forking_testchain: bool,
    pub metadata: Vec<u8>,
}
