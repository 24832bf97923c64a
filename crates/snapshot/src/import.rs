use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use vx_chain::{init_chain, store_applied_head, PatchContext, ReplayValidator, Validator};
use vx_context::{ContextIndex, RestoredChunk};
use vx_store::{traits::chain_store::ChainStore, Store};
use vx_types::{
    BlockContents, BlockHash, ChainId, Genesis, HistoryMode, PrunedBlock,
};

use crate::consistency::check_history_consistency;
use crate::error::SnapshotError;
use crate::predecessors::predecessor_table;
use crate::{
    context_dir, new_progress_bar, store_dir, BULK_STORE_CHUNK_SIZE, PROGRESS_INTERVAL,
    RECONSTRUCT_CHUNK_SIZE,
};

pub struct ImportArgs {
    pub data_dir: PathBuf,
    pub genesis: Genesis,
    pub source: PathBuf,
    pub block: Option<BlockHash>,
    pub reconstruct: bool,
    pub show_progress: bool,
}

/// ImportSnapshot
///
/// Rehydrates an empty data directory from a snapshot file. Any failure,
/// error or panic alike, hands the directory to the caller's cleaner
/// before propagating, so no partially-written node survives.
pub struct ImportSnapshot {
    args: ImportArgs,
    dir_cleaner: Box<dyn FnOnce(&Path)>,
    patch_context: Option<Box<PatchContext>>,
}

impl ImportSnapshot {
    pub fn create(
        args: ImportArgs,
        dir_cleaner: Box<dyn FnOnce(&Path)>,
        patch_context: Option<Box<PatchContext>>,
    ) -> Self {
        ImportSnapshot {
            args,
            dir_cleaner,
            patch_context,
        }
    }

    pub fn execute(self) -> Result<()> {
        let ImportSnapshot {
            args,
            dir_cleaner,
            patch_context,
        } = self;
        let data_dir = args.data_dir.clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_import(&args, patch_context.as_deref())
        }));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                log::warn!(
                    "snapshot import failed, cleaning up {}: {:#}",
                    data_dir.display(),
                    err
                );
                dir_cleaner(&data_dir);
                Err(err)
            }
            Err(payload) => {
                dir_cleaner(&data_dir);
                panic::resume_unwind(payload)
            }
        }
    }
}

fn dir_is_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

fn run_import(args: &ImportArgs, patch_context: Option<&PatchContext>) -> Result<()> {
    assert!(
        dir_is_empty(&args.data_dir)?,
        "cannot import a snapshot into non-empty directory {}",
        args.data_dir.display()
    );
    fs::create_dir_all(&args.data_dir)?;

    let store = Store::open(store_dir(&args.data_dir))?;
    let index = ContextIndex::init(context_dir(&args.data_dir), false)?;
    // Rolling is a placeholder; the real mode is known once the history
    // shape is.
    let chain_id = init_chain(
        &store,
        &index,
        &args.genesis,
        patch_context,
        HistoryMode::Rolling,
    )?;
    let validator = ReplayValidator;

    let chunks = index.restore_contexts(&args.source)?;
    for chunk in chunks {
        import_chunk(args, &store, &index, &validator, &chain_id, chunk)?;
    }

    log::info!("successful import from {}", args.source.display());
    Ok(())
}

fn import_chunk(
    args: &ImportArgs,
    store: &Store,
    index: &ContextIndex,
    validator: &ReplayValidator,
    chain_id: &ChainId,
    chunk: RestoredChunk,
) -> Result<()> {
    let RestoredChunk {
        pred_header,
        block_data,
        old_blocks,
        protocol_data,
    } = chunk;

    let block_hash = block_data.block_header.hash();
    match args.block {
        Some(expected) if expected != block_hash => {
            return Err(SnapshotError::InconsistentImportedBlock {
                expected,
                got: block_hash,
            }
            .into());
        }
        Some(_) => {}
        None => log::info!(
            "importing block {} at level {}",
            block_hash,
            block_data.block_header.level
        ),
    }
    assert!(
        store.get_block_header(&block_hash)?.is_none(),
        "block {} is already present",
        block_hash
    );

    // Re-apply the head on top of the restored context and require the
    // header's commitment back.
    let pred_context = index.checkout_or_err(&pred_header.context)?;
    // Surprising but deliberate: the predecessor level stands in for the
    // ttl. The validator only needs an upper bound, and the level always
    // is one.
    let result = validator.apply(
        index,
        chain_id,
        pred_header.level,
        &pred_header,
        pred_context,
        &block_data.block_header,
        &block_data.operations,
    )?;
    if result.context_hash != block_data.block_header.context {
        return Err(SnapshotError::SnapshotImportFailure(
            "resulting context hash does not match".into(),
        )
        .into());
    }

    // The wire carries the history newest first.
    let history: Vec<(BlockHash, PrunedBlock)> = old_blocks
        .into_iter()
        .rev()
        .map(|pruned| (pruned.block_header.hash(), pruned))
        .collect();
    check_history_consistency(&args.genesis.block, &block_data.block_header, &history)?;
    let oldest_level = history[0].1.level();
    let oldest_hash = history[0].0;

    // A history reaching the block right after genesis is a full snapshot.
    let history_mode = if oldest_level == 1 {
        HistoryMode::Full
    } else {
        HistoryMode::Rolling
    };

    import_protocol_data(store, index, &history, oldest_level, protocol_data)?;

    store_pruned_blocks(
        store,
        &history,
        oldest_level,
        &args.genesis.block,
        args.show_progress,
    )?;

    let mut txn = store.begin_transaction();
    store_applied_head(&mut txn, &block_hash, &block_data, &result)?;
    {
        // the head gets its own skip-list entries
        let mut hashes: Vec<BlockHash> = history.iter().map(|(hash, _)| *hash).collect();
        hashes.push(block_hash);
        let table = predecessor_table(&hashes, hashes.len() - 1, oldest_level, &args.genesis.block);
        for (rank, predecessor) in &table {
            txn.insert_predecessor(&block_hash, *rank, predecessor)?;
        }
        if let Some((0, predecessor)) = table.first() {
            txn.insert_in_main_branch(predecessor, &block_hash)?;
        }
    }

    txn.set_checkpoint(&block_data.block_header)?;
    txn.set_save_point(block_data.block_header.level, &block_hash)?;
    let (caboose_level, caboose_hash) = if oldest_level == 1 {
        (0, args.genesis.block)
    } else {
        (oldest_level, oldest_hash)
    };
    if caboose_level > block_data.block_header.level - result.validation_result.max_operations_ttl
    {
        return Err(SnapshotError::SnapshotImportFailure(format!(
            "caboose level {} is above the operations ttl window",
            caboose_level
        ))
        .into());
    }
    txn.set_caboose(caboose_level, &caboose_hash)?;
    txn.set_history_mode(history_mode)?;
    txn.commit()?;

    if args.reconstruct {
        if oldest_level != 1 {
            return Err(SnapshotError::WrongReconstructMode.into());
        }
        reconstruct_contexts(store, index, validator, chain_id, &history, args.show_progress)?;
    }
    Ok(())
}

/// Re-commit every protocol epoch root carried by the snapshot and record
/// the activation in the chain store.
fn import_protocol_data(
    store: &Store,
    index: &ContextIndex,
    history: &[(BlockHash, PrunedBlock)],
    oldest_level: i32,
    protocol_data: Vec<(i32, vx_types::ProtocolData)>,
) -> Result<()> {
    let mut txn = store.begin_transaction();
    for (level, data) in protocol_data {
        let entry = if level < oldest_level {
            None
        } else {
            history.get((level - oldest_level) as usize)
        };
        let (_, pruned) = entry.ok_or_else(|| {
            SnapshotError::SnapshotImportFailure(format!(
                "protocol data at level {} is outside the snapshot history",
                level
            ))
        })?;

        let valid = index.validate_context_hash_consistency_and_commit(
            data.info.author,
            data.info.timestamp,
            data.info.message,
            data.data_key,
            data.parents,
            &pruned.block_header.context,
            data.test_chain_status,
            data.protocol_hash,
        )?;
        if !valid {
            return Err(SnapshotError::WrongProtocolHash(data.protocol_hash).into());
        }
        txn.set_protocol(data.proto_level, &data.protocol_hash)?;
    }
    txn.commit()?;
    Ok(())
}

/// Walk the history oldest to newest, persisting every pruned record and
/// its skip-list entries inside bounded atomic write scopes.
fn store_pruned_blocks(
    store: &Store,
    history: &[(BlockHash, PrunedBlock)],
    oldest_level: i32,
    genesis: &BlockHash,
    show_progress: bool,
) -> Result<()> {
    let total = history.len();
    log::info!("storing {} pruned blocks", total);
    let progress_bar = if show_progress {
        Some(new_progress_bar(total as u64))
    } else {
        None
    };

    let hashes: Vec<BlockHash> = history.iter().map(|(hash, _)| *hash).collect();
    let mut txn = store.begin_transaction();
    for (i, (hash, pruned)) in history.iter().enumerate() {
        txn.insert_block_header(hash, &pruned.block_header)?;
        for (pass, ops) in &pruned.operations {
            txn.insert_operations(hash, *pass, ops)?;
        }
        for (pass, op_hashes) in &pruned.operation_hashes {
            txn.insert_operation_hashes(hash, *pass, op_hashes)?;
        }
        let table = predecessor_table(&hashes, i, oldest_level, genesis);
        for (rank, predecessor) in &table {
            txn.insert_predecessor(hash, *rank, predecessor)?;
        }
        if let Some((0, predecessor)) = table.first() {
            txn.insert_in_main_branch(predecessor, hash)?;
        }

        if (i + 1) % BULK_STORE_CHUNK_SIZE == 0 {
            txn.commit()?;
            txn = store.begin_transaction();
        }
        if (i + 1) % PROGRESS_INTERVAL == 0 {
            log::info!("storing pruned blocks: {}/{}", i + 1, total);
        }
        if let Some(ref bar) = progress_bar {
            bar.inc(1);
        }
    }
    txn.commit()?;

    if let Some(ref bar) = progress_bar {
        bar.finish_with_message("done");
    }
    Ok(())
}

/// Re-apply every history block from genesis, rebuilding each context and
/// checking it against the header commitment. The replayed validation
/// records are kept, leaving the node with every context since genesis.
fn reconstruct_contexts(
    store: &Store,
    index: &ContextIndex,
    validator: &ReplayValidator,
    chain_id: &ChainId,
    history: &[(BlockHash, PrunedBlock)],
    show_progress: bool,
) -> Result<()> {
    let total = history.len();
    log::info!("reconstructing all the contexts from genesis");
    let progress_bar = if show_progress {
        Some(new_progress_bar(total as u64))
    } else {
        None
    };

    let mut txn = store.begin_transaction();
    for (i, (hash, pruned)) in history.iter().enumerate() {
        let header = &pruned.block_header;
        let pred_header = txn
            .get_block_header(&header.predecessor)?
            .ok_or_else(|| anyhow!("missing predecessor header at level {}", header.level))?;
        let pred_context = index.checkout_or_err(&pred_header.context)?;
        let operations = pruned.operations_in_order();
        // Same ttl upper-bound trick as the head application above.
        let result = validator.apply(
            index,
            chain_id,
            pred_header.level,
            &pred_header,
            pred_context,
            header,
            &operations,
        )?;
        if result.context_hash != header.context {
            return Err(SnapshotError::SnapshotImportFailure(format!(
                "resulting context hash at level {} does not match",
                header.level
            ))
            .into());
        }
        txn.insert_block_contents(
            hash,
            &BlockContents {
                context: result.context_hash,
                message: result.validation_result.message,
                max_operations_ttl: result.validation_result.max_operations_ttl,
                last_allowed_fork_level: result.validation_result.last_allowed_fork_level,
                forking_testchain: result.forking_testchain,
                metadata: result.block_metadata,
            },
        )?;

        // Commit once every RECONSTRUCT_CHUNK_SIZE applications.
        if (i + 1) % RECONSTRUCT_CHUNK_SIZE == 0 {
            txn.commit()?;
            txn = store.begin_transaction();
        }
        match progress_bar {
            Some(ref bar) => bar.inc(1),
            None => log::debug!("reconstructing contexts: {}/{}", i + 1, total),
        }
    }

    // Every context since genesis is now available.
    txn.set_history_mode(HistoryMode::Archive)?;
    txn.commit()?;

    if let Some(ref bar) = progress_bar {
        bar.finish_with_message("done");
    }
    log::info!("reconstructed {} contexts", total);
    Ok(())
}
