//! Cross-checks tying headers to their operations and to each other.

use anyhow::Result;
use vx_types::{
    BlockHash, BlockHeader, Operation, OperationHash, OperationListHash, OperationListListHash,
    PrunedBlock,
};

use crate::error::SnapshotError;
use crate::PROGRESS_INTERVAL;

/// Verify the stored operation hashes against the operations and both
/// against the header's Merkle commitment.
///
/// An operation disagreeing with its own stored hash means the record was
/// assembled wrong, not that the snapshot is bad; that fails hard.
pub fn check_operations_consistency(pruned: &PrunedBlock) -> Result<()> {
    assert_eq!(
        pruned.operations.len(),
        pruned.operation_hashes.len(),
        "pruned block carries {} operation passes but {} hash passes",
        pruned.operations.len(),
        pruned.operation_hashes.len(),
    );
    for ((pass, ops), (hash_pass, hashes)) in
        pruned.operations.iter().zip(pruned.operation_hashes.iter())
    {
        assert_eq!(pass, hash_pass, "operation passes out of order");
        assert_eq!(
            ops.len(),
            hashes.len(),
            "pass {} carries {} operations but {} hashes",
            pass,
            ops.len(),
            hashes.len(),
        );
        for (op, expected) in ops.iter().zip(hashes.iter()) {
            assert_eq!(
                op.hash(),
                *expected,
                "stored operation hash diverges from its operation"
            );
        }
    }

    // The record carries passes highest first; the Merkle tree is defined
    // lowest first.
    let mut passes: Vec<&Vec<Operation>> = pruned.operations.iter().map(|(_, ops)| ops).collect();
    passes.reverse();
    let roots: Vec<OperationListHash> = passes
        .iter()
        .map(|ops| {
            let hashes: Vec<OperationHash> = ops.iter().map(Operation::hash).collect();
            OperationListHash::compute(&hashes)
        })
        .collect();
    let observed = OperationListListHash::compute(&roots);
    let expected = pruned.block_header.operations_hash;
    if observed != expected {
        return Err(SnapshotError::InconsistentOperationHashes { observed, expected }.into());
    }
    Ok(())
}

/// Verify that `history` is a well-formed chain ending right below the
/// snapshot head, down to genesis when the history is complete.
pub fn check_history_consistency(
    genesis: &BlockHash,
    head_header: &BlockHeader,
    history: &[(BlockHash, PrunedBlock)],
) -> Result<()> {
    let (last_hash, _) = history
        .last()
        .ok_or_else(|| SnapshotError::SnapshotImportFailure("the snapshot history is empty".into()))?;
    if head_header.predecessor != *last_hash {
        return Err(SnapshotError::SnapshotImportFailure(
            "the snapshot head does not descend from its history".into(),
        )
        .into());
    }

    let (_, oldest) = &history[0];
    if oldest.level() < 1 {
        return Err(SnapshotError::SnapshotImportFailure(format!(
            "invalid oldest history level {}",
            oldest.level()
        ))
        .into());
    }
    if oldest.level() == 1 && oldest.block_header.predecessor != *genesis {
        return Err(SnapshotError::SnapshotImportFailure(
            "the snapshot history does not start at genesis".into(),
        )
        .into());
    }
    check_operations_consistency(oldest)?;

    let total = history.len();
    for i in (1..total).rev() {
        let (_, pruned) = &history[i];
        check_operations_consistency(pruned)?;
        if pruned.level() < 2 {
            return Err(SnapshotError::SnapshotImportFailure(format!(
                "invalid history level {} above the oldest block",
                pruned.level()
            ))
            .into());
        }
        if pruned.block_header.predecessor != history[i - 1].0 {
            return Err(SnapshotError::SnapshotImportFailure(format!(
                "broken predecessor link at level {}",
                pruned.level()
            ))
            .into());
        }
        let checked = total - i;
        if checked % PROGRESS_INTERVAL == 0 {
            log::info!("checking history consistency: {}/{}", checked, total);
        }
    }
    Ok(())
}
