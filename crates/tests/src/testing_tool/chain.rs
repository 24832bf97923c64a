//! Builds real chains for the snapshot tests: a store and context index in
//! a temp data directory, blocks produced through the node's own
//! validator.

use anyhow::Result;
use tempfile::TempDir;
use vx_chain::{init_chain, store_applied_head, ReplayValidator, Validator};
use vx_context::ContextIndex;
use vx_snapshot::{context_dir, store_dir};
use vx_store::{traits::chain_store::ChainStore, Store};
use vx_types::block::operations_merkle_root;
use vx_types::{
    BlockData, BlockHash, BlockHeader, ChainId, ContextHash, Genesis, HistoryMode, Operation,
};

pub fn test_genesis() -> Genesis {
    Genesis {
        block: [11u8; 32].into(),
        protocol: [22u8; 32].into(),
        timestamp: 1_600_000_000,
    }
}

pub struct TestNode {
    pub data_dir: TempDir,
    pub store: Store,
    pub index: ContextIndex,
    pub genesis: Genesis,
    pub chain_id: ChainId,
    /// Hash of every produced block; `hashes[level - 1]` is the block at
    /// `level`.
    pub hashes: Vec<BlockHash>,
}

impl TestNode {
    pub fn head_hash(&self) -> BlockHash {
        *self.hashes.last().expect("chain has blocks")
    }

    pub fn hash_at(&self, level: i32) -> BlockHash {
        self.hashes[(level - 1) as usize]
    }

    pub fn header_at(&self, level: i32) -> BlockHeader {
        self.store
            .get_block_header(&self.hash_at(level))
            .unwrap()
            .expect("header stored")
    }
}

/// An archive-mode node whose chain is `levels` blocks long.
pub fn setup_chain(levels: i32) -> Result<TestNode> {
    let data_dir = tempfile::tempdir()?;
    let store = Store::open(store_dir(data_dir.path()))?;
    let index = ContextIndex::init(context_dir(data_dir.path()), false)?;
    let genesis = test_genesis();
    let chain_id = init_chain(&store, &index, &genesis, None, HistoryMode::Archive)?;

    let mut node = TestNode {
        data_dir,
        store,
        index,
        genesis,
        chain_id,
        hashes: Vec::new(),
    };
    for _ in 0..levels {
        produce_block(&mut node)?;
    }
    Ok(node)
}

/// Two deterministic operation passes for a block at `level`, branched on
/// its predecessor.
fn block_operations(level: i32, predecessor: BlockHash) -> Vec<Vec<Operation>> {
    let op = |tag: u8| Operation {
        branch: predecessor,
        data: vec![tag, level as u8, (level >> 8) as u8],
    };
    vec![vec![op(0)], vec![op(1), op(2)]]
}

pub fn produce_block(node: &mut TestNode) -> Result<BlockHash> {
    let validator = ReplayValidator;
    let head_hash = node
        .store
        .get_current_head()?
        .expect("chain is initialized");
    let head = node
        .store
        .get_block_header(&head_hash)?
        .expect("head header stored");
    let level = head.level + 1;

    let operations = block_operations(level, head_hash);
    let mut header = BlockHeader {
        level,
        predecessor: head_hash,
        timestamp: node.genesis.timestamp + level as i64,
        proto_level: 0,
        validation_passes: operations.len() as u8,
        operations_hash: operations_merkle_root(&operations),
        fitness: vec![level.to_be_bytes().to_vec()],
        context: ContextHash::zero(),
        protocol_data: vec![],
    };

    let head_context = node.index.checkout_or_err(&head.context)?;
    let result = validator.apply(
        &node.index,
        &node.chain_id,
        head.level,
        &head,
        head_context,
        &header,
        &operations,
    )?;
    header.context = result.context_hash;

    let block_hash = header.hash();
    let block_data = BlockData {
        block_header: header.clone(),
        operations,
    };
    let mut txn = node.store.begin_transaction();
    store_applied_head(&mut txn, &block_hash, &block_data, &result)?;
    // immediate finality in tests
    txn.set_checkpoint(&header)?;
    txn.commit()?;

    node.hashes.push(block_hash);
    Ok(block_hash)
}
