use std::path::PathBuf;

use anyhow::Result;
use indicatif::ProgressBar;
use vx_context::{ContextIndex, SnapshotDumpItem};
use vx_store::{traits::chain_store::ChainStore, StoreReadonly};
use vx_types::{BlockData, BlockHash, BlockHeader, Genesis, HistoryMode, Operation};

use crate::error::{SnapshotError, WrongBlockExportReason};
use crate::iterator::PrunedBlockIterator;
use crate::{context_dir, new_progress_bar, store_dir};

pub struct ExportArgs {
    pub data_dir: PathBuf,
    pub genesis: Genesis,
    pub output: PathBuf,
    pub block: Option<BlockHash>,
    pub export_rolling: bool,
    pub show_progress: bool,
}

/// ExportSnapshot
///
/// Runs against read-only database handles, so a live node does not need
/// to be stopped. The snapshot file itself is written by the context
/// subsystem; export only resolves the target and drives the history walk.
pub struct ExportSnapshot {
    snap: StoreReadonly,
    context: ContextIndex,
    output: PathBuf,
    target: BlockHash,
    export_rolling: bool,
    show_progress: bool,
}

impl ExportSnapshot {
    pub fn create(args: ExportArgs) -> Result<Self> {
        let snap = StoreReadonly::open(store_dir(&args.data_dir))?;
        let context = ContextIndex::init(context_dir(&args.data_dir), true)?;

        // A rolling node is missing block bodies a full snapshot must carry.
        if let Some(HistoryMode::Rolling) = snap.get_history_mode()? {
            if !args.export_rolling {
                return Err(SnapshotError::WrongSnapshotExport {
                    src: HistoryMode::Rolling,
                    dst: HistoryMode::Full,
                }
                .into());
            }
        }

        let target = match args.block {
            Some(hash) => hash,
            None => {
                let checkpoint = snap.get_checkpoint()?;
                if checkpoint.level == 0 {
                    return Err(SnapshotError::WrongBlockExport {
                        hash: args.genesis.block,
                        reason: WrongBlockExportReason::TooFewPredecessors,
                    }
                    .into());
                }
                let hash = checkpoint.hash();
                log::info!(
                    "no block hash specified, exporting the current checkpoint {} at level {}",
                    hash,
                    checkpoint.level
                );
                hash
            }
        };

        Ok(ExportSnapshot {
            snap,
            context,
            output: args.output,
            target,
            export_rolling: args.export_rolling,
            show_progress: args.show_progress,
        })
    }

    pub fn execute(self) -> Result<()> {
        let target_header = self.snap.get_block_header(&self.target)?.ok_or(
            SnapshotError::WrongBlockExport {
                hash: self.target,
                reason: WrongBlockExportReason::CannotBeFound,
            },
        )?;
        let pred_header = self.snap.get_block_header(&target_header.predecessor)?.ok_or(
            SnapshotError::WrongBlockExport {
                hash: target_header.predecessor,
                reason: WrongBlockExportReason::CannotBeFound,
            },
        )?;

        let mut operations: Vec<Vec<Operation>> =
            Vec::with_capacity(target_header.validation_passes as usize);
        for pass in 0..target_header.validation_passes {
            let ops = self.snap.get_operations(&self.target, pass)?.ok_or(
                SnapshotError::WrongBlockExport {
                    hash: self.target,
                    reason: WrongBlockExportReason::Pruned,
                },
            )?;
            operations.push(ops);
        }

        let limit = self.compute_export_limit(&target_header)?;
        log::info!(
            "exporting block {} at level {}, down to level {}",
            self.target,
            target_header.level,
            limit
        );

        let progress_bar: Option<ProgressBar> = if self.show_progress {
            Some(new_progress_bar(
                (target_header.level - limit) as u64 + 1,
            ))
        } else {
            None
        };

        let block_data = BlockData {
            block_header: target_header.clone(),
            operations,
        };
        let mut iterator = PrunedBlockIterator::new(&self.snap, &self.context, limit);
        let step = |header: &BlockHeader| {
            if let Some(ref bar) = progress_bar {
                bar.inc(1);
            }
            iterator.step(header)
        };

        let item = SnapshotDumpItem {
            pred_header,
            block_data,
            target_header,
        };
        self.context.dump_contexts(vec![(item, step)], &self.output)?;

        if let Some(ref bar) = progress_bar {
            bar.finish_with_message("done");
        }
        log::info!("successful export: {}", self.output.display());
        Ok(())
    }

    fn compute_export_limit(&self, target_header: &BlockHeader) -> Result<i32> {
        let contents = self.snap.get_block_contents(&self.target)?.ok_or(
            SnapshotError::WrongBlockExport {
                hash: self.target,
                reason: WrongBlockExportReason::Pruned,
            },
        )?;

        if !self.export_rolling {
            // everything down to the oldest block the node knows
            let (caboose_level, _) = self.snap.get_caboose()?;
            return Ok(caboose_level.max(1));
        }

        // The target must have max_operations_ttl ancestors, genesis
        // excluded.
        let limit = target_header.level - contents.max_operations_ttl;
        if limit <= 0 {
            return Err(SnapshotError::WrongBlockExport {
                hash: self.target,
                reason: WrongBlockExportReason::TooFewPredecessors,
            }
            .into());
        }
        Ok(limit)
    }
}
