use std::fmt;

use thiserror::Error;
use vx_types::{BlockHash, HistoryMode, OperationListListHash, ProtocolHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrongBlockExportReason {
    Pruned,
    TooFewPredecessors,
    CannotBeFound,
}

impl fmt::Display for WrongBlockExportReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            WrongBlockExportReason::Pruned => "the block has been pruned",
            WrongBlockExportReason::TooFewPredecessors => "the block has too few predecessors",
            WrongBlockExportReason::CannotBeFound => "the block cannot be found",
        };
        write!(f, "{}", repr)
    }
}

/// Error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("cannot export a {dst} snapshot from a node running in {src} mode")]
    WrongSnapshotExport { src: HistoryMode, dst: HistoryMode },
    #[error("cannot export block {hash}: {reason}")]
    WrongBlockExport {
        hash: BlockHash,
        reason: WrongBlockExportReason,
    },
    #[error("imported block {got} is not the one expected ({expected})")]
    InconsistentImportedBlock { expected: BlockHash, got: BlockHash },
    #[error("snapshot import failed: {0}")]
    SnapshotImportFailure(String),
    #[error("cannot reconstruct the contexts of a partial snapshot")]
    WrongReconstructMode,
    #[error("failed to validate protocol {0} against the restored context")]
    WrongProtocolHash(ProtocolHash),
    #[error("inconsistent operations hash: observed {observed}, expected {expected}")]
    InconsistentOperationHashes {
        observed: OperationListListHash,
        expected: OperationListListHash,
    },
}
