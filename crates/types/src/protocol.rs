//! Protocol transition markers.

use serde::{Deserialize, Serialize};

use crate::hash::{BlockHash, ChainId, ContextHash, ProtocolHash};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub author: String,
    pub timestamp: i64,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestChainStatus {
    NotRunning,
    Forking {
        protocol: ProtocolHash,
        expiration: i64,
    },
    Running {
        chain_id: ChainId,
        genesis: BlockHash,
        protocol: ProtocolHash,
        expiration: i64,
    },
}

/// Everything needed to re-commit a protocol epoch root in a restored
/// context: the commit pieces plus the activated protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolData {
    pub info: CommitInfo,
    pub test_chain_status: TestChainStatus,
    /// Hash of the state tree the commit points at.
    pub data_key: ContextHash,
    pub parents: Vec<ContextHash>,
    pub protocol_hash: ProtocolHash,
    pub proto_level: u8,
}
