use serde::{Deserialize, Serialize};

use crate::block::BlockHeader;
use crate::hash::{BlockHash, ContextHash, OperationListListHash, ProtocolHash};

/// Genesis description. The genesis block hash is a chain constant, not
/// derived from the genesis header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub block: BlockHash,
    pub protocol: ProtocolHash,
    pub timestamp: i64,
}

impl Genesis {
    /// The level-0 header. Genesis is its own predecessor.
    pub fn header(&self, context: ContextHash) -> BlockHeader {
        BlockHeader {
            level: 0,
            predecessor: self.block,
            timestamp: self.timestamp,
            proto_level: 0,
            validation_passes: 0,
            operations_hash: OperationListListHash::zero(),
            fitness: vec![],
            context,
            protocol_data: vec![],
        }
    }
}
