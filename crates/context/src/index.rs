use std::path::Path;

use anyhow::{anyhow, bail, Result};
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use vx_types::{
    BlockData, BlockHeader, CommitInfo, ContextHash, ProtocolData, ProtocolHash, PrunedBlock,
    TestChainStatus,
};

use crate::context::{CommitRecord, Context};
use crate::snapshot_file::{read_snapshot_file, write_snapshot_file, SnapshotEntry, SnapshotFile};

const COLUMN_COMMIT: &str = "0";
const COLUMN_TREE: &str = "1";
const COLUMNS: u32 = 2;

/// Handle on the content-addressed context database.
pub struct ContextIndex {
    db: DB,
    readonly: bool,
}

/// One export work item: the snapshot head with its predecessor, plus the
/// header the history walk starts from.
pub struct SnapshotDumpItem {
    pub pred_header: BlockHeader,
    pub block_data: BlockData,
    pub target_header: BlockHeader,
}

/// One restored snapshot tuple. `old_blocks` is newest first, the order the
/// wire carries.
pub struct RestoredChunk {
    pub pred_header: BlockHeader,
    pub block_data: BlockData,
    pub old_blocks: Vec<PrunedBlock>,
    pub protocol_data: Vec<(i32, ProtocolData)>,
}

impl ContextIndex {
    pub fn init<P: AsRef<Path>>(path: P, readonly: bool) -> Result<Self> {
        let db = if readonly {
            let opts = Options::default();
            let cf_names = (0..COLUMNS).map(|c| c.to_string());
            DB::open_cf_for_read_only(&opts, path, cf_names, false)?
        } else {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            let cfs =
                (0..COLUMNS).map(|c| ColumnFamilyDescriptor::new(c.to_string(), Options::default()));
            DB::open_cf_descriptors(&opts, path, cfs)?
        };
        Ok(ContextIndex { db, readonly })
    }

    fn cf(&self, col: &str) -> &rocksdb::ColumnFamily {
        self.db.cf_handle(col).expect("unknown column")
    }

    fn get(&self, col: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.db
            .get_cf(self.cf(col), key)
            .expect("db operation should be ok")
    }

    fn put(&self, col: &str, key: &[u8], value: &[u8]) -> Result<()> {
        if self.readonly {
            bail!("context index is read-only");
        }
        self.db.put_cf(self.cf(col), key, value)?;
        Ok(())
    }

    /// Flush every column to sst files. Read-only handles do not replay the
    /// write-ahead log, so a live node flushes before an in-process export.
    pub fn flush(&self) -> Result<()> {
        for c in 0..COLUMNS {
            let name = c.to_string();
            let cf = self.db.cf_handle(&name).expect("unknown column");
            self.db.flush_cf(cf)?;
        }
        Ok(())
    }

    pub fn commit_record(&self, hash: &ContextHash) -> Result<Option<CommitRecord>> {
        match self.get(COLUMN_COMMIT, hash.as_slice()) {
            Some(slice) => Ok(Some(bincode::deserialize(&slice)?)),
            None => Ok(None),
        }
    }

    /// The state tree committed under `hash`, when both the commit record
    /// and its tree are present.
    pub fn checkout(&self, hash: &ContextHash) -> Result<Option<Context>> {
        let commit = match self.commit_record(hash)? {
            Some(commit) => commit,
            None => return Ok(None),
        };
        match self.get(COLUMN_TREE, commit.data_key.as_slice()) {
            Some(slice) => Ok(Some(Context::decode(&slice)?)),
            None => Ok(None),
        }
    }

    pub fn checkout_or_err(&self, hash: &ContextHash) -> Result<Context> {
        self.checkout(hash)?
            .ok_or_else(|| anyhow!("unknown context {}", hash))
    }

    /// Store the tree and a commit pointing at it; the commit hash is the
    /// new context hash.
    pub fn commit(
        &self,
        info: CommitInfo,
        parents: Vec<ContextHash>,
        protocol: ProtocolHash,
        test_chain_status: TestChainStatus,
        context: &Context,
    ) -> Result<ContextHash> {
        let tree_bytes = context.encode();
        let data_key = context.data_key();
        let commit = CommitRecord {
            data_key,
            parents,
            info,
            protocol,
            test_chain_status,
        };
        let hash = commit.hash();
        self.put(COLUMN_TREE, data_key.as_slice(), &tree_bytes)?;
        self.put(
            COLUMN_COMMIT,
            hash.as_slice(),
            &bincode::serialize(&commit)?,
        )?;
        Ok(hash)
    }

    /// The commit pieces of a header's context, packaged so an importer can
    /// re-commit the protocol epoch root without the tree.
    pub fn get_protocol_data_from_header(&self, header: &BlockHeader) -> Result<ProtocolData> {
        let commit = self
            .commit_record(&header.context)?
            .ok_or_else(|| anyhow!("unknown context {} at level {}", header.context, header.level))?;
        Ok(ProtocolData {
            info: commit.info,
            test_chain_status: commit.test_chain_status,
            data_key: commit.data_key,
            parents: commit.parents,
            protocol_hash: commit.protocol,
            proto_level: header.proto_level,
        })
    }

    /// Rebuild a commit from its pieces; persist it and return true only
    /// when it hashes to the expected context hash.
    #[allow(clippy::too_many_arguments)]
    pub fn validate_context_hash_consistency_and_commit(
        &self,
        author: String,
        timestamp: i64,
        message: String,
        data_key: ContextHash,
        parents: Vec<ContextHash>,
        expected_context_hash: &ContextHash,
        test_chain_status: TestChainStatus,
        protocol_hash: ProtocolHash,
    ) -> Result<bool> {
        let commit = CommitRecord {
            data_key,
            parents,
            info: CommitInfo {
                author,
                timestamp,
                message,
            },
            protocol: protocol_hash,
            test_chain_status,
        };
        if commit.hash() != *expected_context_hash {
            return Ok(false);
        }
        self.put(
            COLUMN_COMMIT,
            expected_context_hash.as_slice(),
            &bincode::serialize(&commit)?,
        )?;
        Ok(true)
    }

    /// Write a snapshot file. Each work item's `step` closure is driven
    /// from the target header until it stops producing pruned blocks; the
    /// predecessor's full context is packaged alongside.
    pub fn dump_contexts<F>(
        &self,
        items: Vec<(SnapshotDumpItem, F)>,
        path: &Path,
    ) -> Result<()>
    where
        F: FnMut(&BlockHeader) -> Result<(Option<PrunedBlock>, Option<ProtocolData>)>,
    {
        let mut entries = Vec::with_capacity(items.len());
        for (item, mut step) in items {
            let mut old_blocks = Vec::new();
            let mut protocol_data = Vec::new();
            let mut current = item.target_header.clone();
            loop {
                let (pruned, proto) = step(&current)?;
                if let Some(proto) = proto {
                    protocol_data.push((current.level, proto));
                }
                match pruned {
                    Some(pruned) => {
                        let next = pruned.block_header.clone();
                        old_blocks.push(pruned);
                        current = next;
                    }
                    None => break,
                }
            }

            let context_commit = self
                .commit_record(&item.pred_header.context)?
                .ok_or_else(|| anyhow!("unknown context {}", item.pred_header.context))?;
            let context_tree = self
                .get(COLUMN_TREE, context_commit.data_key.as_slice())
                .ok_or_else(|| anyhow!("missing tree for context {}", item.pred_header.context))?;

            entries.push(SnapshotEntry {
                pred_header: item.pred_header,
                block_data: item.block_data,
                old_blocks,
                protocol_data,
                context_commit,
                context_tree,
            });
        }

        write_snapshot_file(path, &SnapshotFile { entries })?;
        log::info!("successfully dumped contexts to {}", path.display());
        Ok(())
    }

    /// Read a snapshot file back: re-commit the packaged context (verifying
    /// its hashes) and hand the block payloads to the caller.
    pub fn restore_contexts(&self, path: &Path) -> Result<Vec<RestoredChunk>> {
        let file = read_snapshot_file(path)?;
        let mut chunks = Vec::with_capacity(file.entries.len());
        for entry in file.entries {
            let SnapshotEntry {
                pred_header,
                block_data,
                old_blocks,
                protocol_data,
                context_commit,
                context_tree,
            } = entry;

            let tree = Context::decode(&context_tree)?;
            if tree.data_key() != context_commit.data_key {
                bail!("corrupted snapshot: context tree does not match its commit");
            }
            let hash = context_commit.hash();
            if hash != pred_header.context {
                bail!("corrupted snapshot: context commit does not match the predecessor header");
            }
            self.put(COLUMN_TREE, context_commit.data_key.as_slice(), &context_tree)?;
            self.put(
                COLUMN_COMMIT,
                hash.as_slice(),
                &bincode::serialize(&context_commit)?,
            )?;

            chunks.push(RestoredChunk {
                pred_header,
                block_data,
                old_blocks,
                protocol_data,
            });
        }
        Ok(chunks)
    }
}
