//! Chain-state management: database initialization and head bookkeeping.

use anyhow::Result;
use vx_context::{Context, ContextIndex};
use vx_store::traits::chain_store::ChainStore;
use vx_store::{Store, StoreTransaction};
use vx_types::{
    BlockContents, BlockData, BlockHash, ChainId, CommitInfo, Genesis, HistoryMode,
    TestChainStatus,
};

use crate::validator::ApplyResult;

/// Hook applied to the genesis context before it is committed, e.g. for
/// sandbox parameters.
pub type PatchContext = dyn Fn(Context) -> Result<Context>;

/// Seed a fresh database: genesis context, genesis block record and the
/// chain-data cells. Both snapshot import and a from-scratch node start
/// here.
///
/// Panics when the store already holds chain data; callers guarantee an
/// empty data directory.
pub fn init_chain(
    store: &Store,
    index: &ContextIndex,
    genesis: &Genesis,
    patch_context: Option<&PatchContext>,
    history_mode: HistoryMode,
) -> Result<ChainId> {
    assert!(
        store.get_current_head()?.is_none(),
        "the data directory is not empty"
    );

    let mut context = Context::default();
    context.insert(b"protocol".to_vec(), genesis.protocol.as_slice().to_vec());
    if let Some(patch) = patch_context {
        context = patch(context)?;
    }
    let context_hash = index.commit(
        CommitInfo {
            author: "vertex".into(),
            timestamp: genesis.timestamp,
            message: "Genesis".into(),
        },
        vec![],
        genesis.protocol,
        TestChainStatus::NotRunning,
        &context,
    )?;

    let header = genesis.header(context_hash);
    let contents = BlockContents {
        context: context_hash,
        message: Some("Genesis".into()),
        max_operations_ttl: 0,
        last_allowed_fork_level: 0,
        forking_testchain: false,
        metadata: vec![],
    };

    let chain_id = ChainId::of_block_hash(&genesis.block);
    let mut txn = store.begin_transaction();
    txn.insert_block_header(&genesis.block, &header)?;
    txn.insert_block_contents(&genesis.block, &contents)?;
    txn.set_current_head(&genesis.block)?;
    txn.set_known_heads(&[genesis.block].into_iter().collect())?;
    txn.set_checkpoint(&header)?;
    txn.set_save_point(0, &genesis.block)?;
    txn.set_caboose(0, &genesis.block)?;
    txn.set_protocol(0, &genesis.protocol)?;
    txn.set_history_mode(history_mode)?;
    txn.set_chain_id(&chain_id)?;
    txn.set_genesis(genesis)?;
    txn.commit()?;

    log::info!(
        "initialized chain {} in {} mode",
        chain_id,
        history_mode
    );
    Ok(chain_id)
}

/// Record a freshly applied head: block record, validation results and the
/// head bookkeeping. The head it replaces (genesis, right after an import)
/// is retired in the same scope.
pub fn store_applied_head(
    txn: &mut StoreTransaction,
    block_hash: &BlockHash,
    block_data: &BlockData,
    result: &ApplyResult,
) -> Result<()> {
    txn.insert_block_header(block_hash, &block_data.block_header)?;
    txn.insert_block_contents(
        block_hash,
        &BlockContents {
            context: result.context_hash,
            message: result.validation_result.message.clone(),
            max_operations_ttl: result.validation_result.max_operations_ttl,
            last_allowed_fork_level: result.validation_result.last_allowed_fork_level,
            forking_testchain: result.forking_testchain,
            metadata: result.block_metadata.clone(),
        },
    )?;

    for (pass, ops) in block_data.operations.iter().enumerate() {
        let pass = pass as u8;
        let hashes: Vec<_> = ops.iter().map(|op| op.hash()).collect();
        txn.insert_operations(block_hash, pass, ops)?;
        txn.insert_operation_hashes(block_hash, pass, &hashes)?;
        if let Some(metadata) = result.ops_metadata.get(pass as usize) {
            txn.insert_operations_metadata(block_hash, pass, metadata)?;
        }
    }

    let mut known_heads = txn.get_known_heads()?;
    if let Some(previous) = txn.get_current_head()? {
        known_heads.remove(&previous);
    }
    known_heads.insert(*block_hash);
    txn.set_known_heads(&known_heads)?;
    txn.set_current_head(block_hash)?;
    Ok(())
}
