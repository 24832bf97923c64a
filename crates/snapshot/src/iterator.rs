//! Backward walk over headers, emitting the pruned-block records a
//! snapshot carries.

use anyhow::Result;
use vx_context::ContextIndex;
use vx_store::traits::chain_store::ChainStore;
use vx_types::{BlockHeader, ProtocolData, PrunedBlock};

use crate::error::{SnapshotError, WrongBlockExportReason};

/// Emits one pruned block per step, walking from the export target down to
/// `limit`. The dump routine drives it by feeding back each emitted
/// predecessor header until the range boundary answers `(None, _)`; the
/// protocol data carried at the boundary lets the importer re-commit the
/// oldest context.
pub struct PrunedBlockIterator<'a, S: ChainStore> {
    snap: &'a S,
    context: &'a ContextIndex,
    limit: i32,
}

impl<'a, S: ChainStore> PrunedBlockIterator<'a, S> {
    pub fn new(snap: &'a S, context: &'a ContextIndex, limit: i32) -> Self {
        PrunedBlockIterator {
            snap,
            context,
            limit,
        }
    }

    pub fn step(
        &mut self,
        header: &BlockHeader,
    ) -> Result<(Option<PrunedBlock>, Option<ProtocolData>)> {
        if header.level <= self.limit {
            let protocol_data = self.context.get_protocol_data_from_header(header)?;
            return Ok((None, Some(protocol_data)));
        }

        let pred_hash = header.predecessor;
        let pruned_err = || SnapshotError::WrongBlockExport {
            hash: pred_hash,
            reason: WrongBlockExportReason::Pruned,
        };
        let pred_header = self
            .snap
            .get_block_header(&pred_hash)?
            .ok_or_else(pruned_err)?;
        let operations = self
            .snap
            .get_operations_bindings(&pred_hash, pred_header.validation_passes)?
            .ok_or_else(pruned_err)?;
        let operation_hashes = self
            .snap
            .get_operation_hashes_bindings(&pred_hash, pred_header.validation_passes)?
            .ok_or_else(pruned_err)?;

        let pruned = PrunedBlock {
            block_header: pred_header,
            operations,
            operation_hashes,
        };
        let protocol_data = if header.proto_level != pruned.block_header.proto_level {
            // a protocol transition happened between these two blocks
            Some(self.context.get_protocol_data_from_header(header)?)
        } else {
            None
        };
        Ok((Some(pruned), protocol_data))
    }
}
