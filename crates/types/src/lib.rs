//! Core data model shared by the store, the context subsystem and the
//! snapshot engine.

pub mod block;
pub mod core;
pub mod genesis;
pub mod hash;
pub mod merkle;
pub mod protocol;

pub use crate::core::HistoryMode;
pub use block::{BlockContents, BlockData, BlockHeader, Operation, PrunedBlock};
pub use genesis::Genesis;
pub use hash::{
    BlockHash, ChainId, ContextHash, OperationHash, OperationListHash, OperationListListHash,
    ProtocolHash,
};
pub use protocol::{CommitInfo, ProtocolData, TestChainStatus};
