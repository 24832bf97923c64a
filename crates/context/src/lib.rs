//! The context subsystem: a content-addressed store of state trees and the
//! commits pointing at them, plus the snapshot file it dumps to and
//! restores from. The snapshot wire format is private to this crate.

mod context;
mod index;
mod snapshot_file;

pub use context::{CommitRecord, Context};
pub use index::{ContextIndex, RestoredChunk, SnapshotDumpItem};
pub use snapshot_file::{read_snapshot_file, write_snapshot_file, SnapshotEntry, SnapshotFile};
