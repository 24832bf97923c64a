use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use vx_context::ContextIndex;
use vx_snapshot::{
    context_dir, store_dir, ExportArgs, ExportSnapshot, ImportArgs, ImportSnapshot, SnapshotError,
};
use vx_store::{traits::chain_store::ChainStore, Store};
use vx_types::{BlockHash, HistoryMode};

use crate::testing_tool::chain::{setup_chain, TestNode};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn export_snapshot(
    node: &TestNode,
    output: &Path,
    block: Option<BlockHash>,
    rolling: bool,
) -> Result<()> {
    // make the writes visible to the export's read-only handles
    node.store.flush()?;
    node.index.flush()?;
    let args = ExportArgs {
        data_dir: node.data_dir.path().to_path_buf(),
        genesis: node.genesis.clone(),
        output: output.to_path_buf(),
        block,
        export_rolling: rolling,
        show_progress: false,
    };
    ExportSnapshot::create(args)?.execute()
}

fn import_snapshot(
    node: &TestNode,
    source: &Path,
    reconstruct: bool,
) -> (Result<()>, PathBuf, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("node");
    let args = ImportArgs {
        data_dir: data_dir.clone(),
        genesis: node.genesis.clone(),
        source: source.to_path_buf(),
        block: None,
        reconstruct,
        show_progress: false,
    };
    let import = ImportSnapshot::create(
        args,
        Box::new(|path: &Path| {
            let _ = fs::remove_dir_all(path);
        }),
        None,
    );
    (import.execute(), data_dir, dir)
}

#[test]
fn test_reconstruct_rebuilds_every_context() {
    init_logger();
    let node = setup_chain(30).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let (result, data_dir, _dir) = import_snapshot(&node, &snapshot, true);
    result.expect("import with reconstruction succeeds");

    let store = Store::open(store_dir(&data_dir)).unwrap();
    let index = ContextIndex::init(context_dir(&data_dir), false).unwrap();

    // a reconstructed node retains every context and every validation
    // record since genesis
    assert_eq!(
        store.get_history_mode().unwrap(),
        Some(HistoryMode::Archive)
    );
    for level in 1..=30 {
        let hash = node.hash_at(level);
        let header = store
            .get_block_header(&hash)
            .unwrap()
            .expect("header stored");
        let context = index
            .checkout_or_err(&header.context)
            .expect("context reconstructed");
        assert!(!context.is_empty());
        assert_eq!(
            context.get(b"level"),
            Some(&level.to_be_bytes()[..]),
            "state at level {}",
            level
        );
        assert!(store.has_block_contents(&hash), "contents at level {}", level);
    }

    // the rebuilt tip context is the one the source chain committed
    let source_head = node.header_at(30);
    let restored_head = store.get_block_header(&node.head_hash()).unwrap().unwrap();
    assert_eq!(source_head.context, restored_head.context);
}

#[test]
fn test_reconstruct_is_rejected_for_rolling_snapshots() {
    init_logger();
    let node = setup_chain(80).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("rolling.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), true).unwrap();

    let (result, data_dir, _dir) = import_snapshot(&node, &snapshot, true);
    let err = result.unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::WrongReconstructMode) => {}
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!data_dir.exists());
}
