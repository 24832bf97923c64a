//! Snapshot export and import.
//!
//! A snapshot packages a prefix of the chain's block history plus one
//! context commitment into a single portable file; importing rehydrates a
//! fresh node from it, optionally reconstructing every historical context
//! by re-executing blocks from genesis.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

pub mod consistency;
pub mod error;
pub mod export;
pub mod import;
pub mod iterator;
pub mod predecessors;

pub use error::{SnapshotError, WrongBlockExportReason};
pub use export::{ExportArgs, ExportSnapshot};
pub use import::{ImportArgs, ImportSnapshot};

/// Entries per atomic write scope in bulk pruned-block storage. Bounds a
/// single transaction below the engine's limits while keeping crash
/// atomicity per chunk.
pub const BULK_STORE_CHUNK_SIZE: usize = 5_000;
/// Applications per atomic write scope during context reconstruction.
pub const RECONSTRUCT_CHUNK_SIZE: usize = 1_000;
/// Blocks between two progress reports.
pub const PROGRESS_INTERVAL: usize = 1_000;

pub fn store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("store")
}

pub fn context_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("context")
}

pub(crate) fn new_progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .progress_chars("##-"),
    );
    bar
}
