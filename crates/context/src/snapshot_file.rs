//! On-disk snapshot format.
//!
//! A fixed magic, then one bincode-encoded payload. Files are written to a
//! temporary sibling and renamed into place so a crash never leaves a
//! valid-looking partial snapshot.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};
use vx_types::{BlockData, BlockHeader, ProtocolData, PrunedBlock};

use crate::context::CommitRecord;

const SNAPSHOT_MAGIC: &[u8; 8] = b"VXSNAP01";

#[derive(Serialize, Deserialize)]
pub struct SnapshotFile {
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub pred_header: BlockHeader,
    pub block_data: BlockData,
    /// Newest first.
    pub old_blocks: Vec<PrunedBlock>,
    pub protocol_data: Vec<(i32, ProtocolData)>,
    pub context_commit: CommitRecord,
    /// Encoded state tree `context_commit.data_key` points at.
    pub context_tree: Vec<u8>,
}

pub fn write_snapshot_file(path: &Path, file: &SnapshotFile) -> Result<()> {
    let payload = bincode::serialize(file)?;
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)
            .with_context(|| format!("create snapshot file {}", tmp_path.display()))?;
        tmp.write_all(SNAPSHOT_MAGIC)?;
        tmp.write_all(&payload)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_snapshot_file(path: &Path) -> Result<SnapshotFile> {
    let mut f = fs::File::open(path)
        .with_context(|| format!("open snapshot file {}", path.display()))?;
    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        bail!("{} is not a vertex snapshot", path.display());
    }
    let mut payload = Vec::new();
    f.read_to_end(&mut payload)?;
    Ok(bincode::deserialize(&payload)?)
}
