use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;
use vx_context::{read_snapshot_file, write_snapshot_file, Context, ContextIndex};
use vx_snapshot::{
    context_dir, store_dir, ExportArgs, ExportSnapshot, ImportArgs, ImportSnapshot, SnapshotError,
    WrongBlockExportReason,
};
use vx_store::{traits::chain_store::ChainStore, Store};
use vx_types::{BlockHash, Genesis, HistoryMode, Operation};

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

struct ImportedNode {
    _dir: TempDir,
    data_dir: PathBuf,
    store: Store,
    index: ContextIndex,
}

fn import_snapshot(
    source: &Path,
    genesis: Genesis,
    block: Option<BlockHash>,
    reconstruct: bool,
) -> (Result<()>, PathBuf, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("node");
    let args = ImportArgs {
        data_dir: data_dir.clone(),
        genesis,
        source: source.to_path_buf(),
        block,
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

fn import_snapshot_ok(
    source: &Path,
    genesis: Genesis,
    block: Option<BlockHash>,
    reconstruct: bool,
) -> ImportedNode {
    let (result, data_dir, dir) = import_snapshot(source, genesis, block, reconstruct);
    result.expect("import succeeds");
    let store = Store::open(store_dir(&data_dir)).unwrap();
    let index = ContextIndex::init(context_dir(&data_dir), false).unwrap();
    ImportedNode {
        _dir: dir,
        data_dir,
        store,
        index,
    }
}

#[test]
fn test_full_export_import_round_trip() {
    init_logger();
    let node = setup_chain(30).unwrap();
    let target = node.head_hash();
    let target_header = node.header_at(30);

    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(target), false).unwrap();

    let imported = import_snapshot_ok(&snapshot, node.genesis.clone(), Some(target), false);
    let store = &imported.store;

    assert_eq!(store.get_current_head().unwrap(), Some(target));
    assert_eq!(store.get_checkpoint().unwrap(), target_header);
    assert_eq!(store.get_save_point().unwrap(), (30, target));
    assert_eq!(store.get_caboose().unwrap(), (0, node.genesis.block));
    assert_eq!(
        store.get_history_mode().unwrap(),
        Some(HistoryMode::Full)
    );
    assert_eq!(
        store.get_known_heads().unwrap().into_iter().collect::<Vec<_>>(),
        vec![target]
    );
    assert_eq!(store.get_genesis().unwrap(), node.genesis);
    assert_eq!(
        store.get_protocol(0).unwrap(),
        Some(node.genesis.protocol)
    );

    // every history block is retrievable, with operations and hashes
    for level in 1..30 {
        let hash = node.hash_at(level);
        let header = store.get_block_header(&hash).unwrap().expect("header");
        assert_eq!(header.level, level);
        assert!(store.get_operations(&hash, 0).unwrap().is_some());
        assert!(store.get_operations(&hash, 1).unwrap().is_some());
        assert!(store.get_operation_hashes(&hash, 1).unwrap().is_some());
        // pruned records carry no validation record
        assert!(!store.has_block_contents(&hash));
    }
    assert!(store.has_block_contents(&target));

    // the skip-list resolves ancestors at every power of two
    for k in 0..5u32 {
        let distance = 1 << k;
        assert_eq!(
            store.get_ancestor(&target, distance).unwrap(),
            Some(node.hash_at(30 - distance as i32)),
            "ancestor at distance {}",
            distance
        );
    }
    assert_eq!(
        store.get_ancestor(&target, 30).unwrap(),
        Some(node.genesis.block)
    );

    // canonical successor links, genesis included
    assert_eq!(
        store.get_in_main_branch(&node.genesis.block).unwrap(),
        Some(node.hash_at(1))
    );
    for level in 1..29 {
        assert_eq!(
            store.get_in_main_branch(&node.hash_at(level)).unwrap(),
            Some(node.hash_at(level + 1))
        );
    }
    assert_eq!(
        store.get_in_main_branch(&node.hash_at(29)).unwrap(),
        Some(target)
    );

    // the head context round-tripped
    let restored_header = store.get_block_header(&target).unwrap().unwrap();
    imported
        .index
        .checkout_or_err(&restored_header.context)
        .unwrap();
}

#[test]
fn test_export_is_deterministic() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    let first = out_dir.path().join("first.snapshot");
    let second = out_dir.path().join("second.snapshot");
    export_snapshot(&node, &first, Some(node.head_hash()), false).unwrap();
    export_snapshot(&node, &second, Some(node.head_hash()), false).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_default_export_target_is_the_checkpoint() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    let explicit = out_dir.path().join("explicit.snapshot");
    let default = out_dir.path().join("default.snapshot");
    export_snapshot(&node, &explicit, Some(node.head_hash()), false).unwrap();
    export_snapshot(&node, &default, None, false).unwrap();

    assert_eq!(fs::read(&explicit).unwrap(), fs::read(&default).unwrap());
}

#[test]
fn test_two_imports_agree() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let a = import_snapshot_ok(&snapshot, node.genesis.clone(), None, false);
    let b = import_snapshot_ok(&snapshot, node.genesis.clone(), None, false);

    assert_eq!(
        a.store.get_current_head().unwrap(),
        b.store.get_current_head().unwrap()
    );
    assert_eq!(a.store.get_caboose().unwrap(), b.store.get_caboose().unwrap());
    assert_eq!(
        a.store.get_checkpoint().unwrap(),
        b.store.get_checkpoint().unwrap()
    );
    assert_eq!(
        a.store.get_chain_id().unwrap(),
        b.store.get_chain_id().unwrap()
    );
}

#[test]
fn test_rolling_export_import() {
    init_logger();
    // long enough that the ttl window (60) leaves ancestors behind
    let node = setup_chain(80).unwrap();
    let target = node.head_hash();

    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("rolling.snapshot");
    export_snapshot(&node, &snapshot, Some(target), true).unwrap();

    let imported = import_snapshot_ok(&snapshot, node.genesis.clone(), Some(target), false);
    let store = &imported.store;

    assert_eq!(
        store.get_history_mode().unwrap(),
        Some(HistoryMode::Rolling)
    );
    // oldest history block is target level minus the ttl
    assert_eq!(store.get_caboose().unwrap(), (20, node.hash_at(20)));
    assert_eq!(store.get_save_point().unwrap(), (80, target));

    // blocks below the caboose are gone
    assert!(store
        .get_block_header(&node.hash_at(19))
        .unwrap()
        .is_none());
    assert!(store
        .get_block_header(&node.hash_at(20))
        .unwrap()
        .is_some());
    assert!(imported.data_dir.join("store").exists());
}

#[test]
fn test_rolling_export_needs_enough_predecessors() {
    init_logger();
    // head level 30 is within the ttl window
    let node = setup_chain(30).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("rolling.snapshot");

    let err = export_snapshot(&node, &snapshot, Some(node.head_hash()), true).unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::WrongBlockExport {
            reason: WrongBlockExportReason::TooFewPredecessors,
            ..
        }) => {}
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!snapshot.exists());
}

#[test]
fn test_rolling_node_refuses_full_export() {
    init_logger();
    let node = setup_chain(80).unwrap();
    let mut txn = node.store.begin_transaction();
    txn.set_history_mode(HistoryMode::Rolling).unwrap();
    txn.commit().unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    let err = export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::WrongSnapshotExport {
            src: HistoryMode::Rolling,
            dst: HistoryMode::Full,
        }) => {}
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_fresh_node_has_no_default_export_target() {
    init_logger();
    let node = setup_chain(0).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("empty.snapshot");

    let err = export_snapshot(&node, &snapshot, None, false).unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::WrongBlockExport {
            hash,
            reason: WrongBlockExportReason::TooFewPredecessors,
        }) => assert_eq!(*hash, node.genesis.block),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_tampered_operations_abort_the_import() {
    init_logger();
    let node = setup_chain(30).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    // flip a byte in one history operation and re-sign its stored hash so
    // only the header's Merkle commitment disagrees
    let tampered = out_dir.path().join("tampered.snapshot");
    let mut file = read_snapshot_file(&snapshot).unwrap();
    {
        let pruned = &mut file.entries[0].old_blocks[17];
        let (_, ops) = &mut pruned.operations[0];
        ops[0].data[0] ^= 1;
        let new_hash = ops[0].hash();
        pruned.operation_hashes[0].1[0] = new_hash;
    }
    write_snapshot_file(&tampered, &file).unwrap();

    let (result, data_dir, _dir) =
        import_snapshot(&tampered, node.genesis.clone(), None, false);
    let err = result.unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::InconsistentOperationHashes { .. }) => {}
        other => panic!("unexpected error {:?}", other),
    }
    // the cleaner wiped the partial state
    assert!(!data_dir.exists());
}

#[test]
fn test_unexpected_head_aborts_the_import() {
    init_logger();
    let node = setup_chain(30).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let expected = node.hash_at(10);
    let (result, data_dir, _dir) =
        import_snapshot(&snapshot, node.genesis.clone(), Some(expected), false);
    let err = result.unwrap_err();
    match err.downcast_ref::<SnapshotError>() {
        Some(SnapshotError::InconsistentImportedBlock { expected: e, got }) => {
            assert_eq!(*e, expected);
            assert_eq!(*got, node.head_hash());
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!data_dir.exists());
}

#[test]
#[should_panic(expected = "non-empty")]
fn test_import_refuses_a_populated_directory() {
    init_logger();
    let node = setup_chain(5).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("node");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("stale"), b"leftover").unwrap();

    let args = ImportArgs {
        data_dir,
        genesis: node.genesis.clone(),
        source: snapshot,
        block: None,
        reconstruct: false,
        show_progress: false,
    };
    let _ = ImportSnapshot::create(args, Box::new(|_: &Path| {}), None).execute();
}

#[test]
fn test_import_detects_a_corrupted_context() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let corrupted = out_dir.path().join("corrupted.snapshot");
    let mut file = read_snapshot_file(&snapshot).unwrap();
    file.entries[0].context_tree.push(7);
    write_snapshot_file(&corrupted, &file).unwrap();

    let (result, data_dir, _dir) =
        import_snapshot(&corrupted, node.genesis.clone(), None, false);
    assert!(result.is_err());
    assert!(!data_dir.exists());
}

#[test]
fn test_patch_context_shapes_the_genesis_context() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("node");
    let args = ImportArgs {
        data_dir: data_dir.clone(),
        genesis: node.genesis.clone(),
        source: snapshot,
        block: None,
        reconstruct: false,
        show_progress: false,
    };
    ImportSnapshot::create(
        args,
        Box::new(|path: &Path| {
            let _ = fs::remove_dir_all(path);
        }),
        Some(Box::new(|mut context: Context| {
            context.insert(b"sandbox".to_vec(), b"enabled".to_vec());
            Ok(context)
        })),
    )
    .execute()
    .unwrap();

    let store = Store::open(store_dir(&data_dir)).unwrap();
    let index = ContextIndex::init(context_dir(&data_dir), false).unwrap();
    let genesis_header = store
        .get_block_header(&node.genesis.block)
        .unwrap()
        .unwrap();
    let genesis_context = index.checkout_or_err(&genesis_header.context).unwrap();
    assert_eq!(genesis_context.get(b"sandbox"), Some(&b"enabled"[..]));
}

#[test]
fn test_operations_survive_the_round_trip() {
    init_logger();
    let node = setup_chain(12).unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let snapshot = out_dir.path().join("full.snapshot");
    export_snapshot(&node, &snapshot, Some(node.head_hash()), false).unwrap();

    let imported = import_snapshot_ok(&snapshot, node.genesis.clone(), None, false);

    for level in 1..12 {
        let hash = node.hash_at(level);
        let original: Vec<Option<Vec<Operation>>> = (0..2)
            .map(|pass| node.store.get_operations(&hash, pass).unwrap())
            .collect();
        let restored: Vec<Option<Vec<Operation>>> = (0..2)
            .map(|pass| imported.store.get_operations(&hash, pass).unwrap())
            .collect();
        assert_eq!(original, restored, "operations at level {}", level);
    }
}
