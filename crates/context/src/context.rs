use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vx_hash::blake2b::blake2b_256;
use vx_types::{CommitInfo, ContextHash, ProtocolHash, TestChainStatus};

/// The working state tree at some block. Keys are ordered so the encoding
/// is canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    tree: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Context {
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.tree.get(key).map(|v| v.as_slice())
    }

    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.tree.insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        bincode::serialize(&self.tree).expect("serialize context tree")
    }

    pub(crate) fn decode(slice: &[u8]) -> anyhow::Result<Self> {
        let tree = bincode::deserialize(slice)?;
        Ok(Context { tree })
    }

    /// Commitment to the tree alone, without commit metadata.
    pub fn data_key(&self) -> ContextHash {
        blake2b_256(self.encode()).into()
    }
}

/// A commit object: points at a state tree and records how it came to be.
/// The context hash of a block is the hash of this record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub data_key: ContextHash,
    pub parents: Vec<ContextHash>,
    pub info: CommitInfo,
    pub protocol: ProtocolHash,
    pub test_chain_status: TestChainStatus,
}

impl CommitRecord {
    pub fn hash(&self) -> ContextHash {
        let bytes = bincode::serialize(self).expect("serialize commit record");
        blake2b_256(bytes).into()
    }
}
