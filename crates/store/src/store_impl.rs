//! Storage implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use tempfile::TempDir;

use crate::schema::{Col, COLUMNS};
use crate::traits::{chain_store::ChainStore, kv_store::KVStoreRead};
use crate::transaction::StoreTransaction;

#[derive(Clone)]
pub struct Store {
    db: Arc<DB>,
    _temp_dir: Option<Arc<TempDir>>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let cfs = (0..COLUMNS)
            .map(|c| ColumnFamilyDescriptor::new(c.to_string(), Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Store {
            db: Arc::new(db),
            _temp_dir: None,
        })
    }

    pub fn open_tmp() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut store = Self::open(dir.path())?;
        store._temp_dir = Some(dir.into());
        Ok(store)
    }

    pub fn begin_transaction(&self) -> StoreTransaction {
        StoreTransaction::new(self)
    }

    pub(crate) fn cf(&self, col: Col) -> &rocksdb::ColumnFamily {
        self.db.cf_handle(col).expect("unknown column")
    }

    pub(crate) fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
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
}

impl ChainStore for Store {}

impl KVStoreRead for Store {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>> {
        self.db
            .get_cf(self.cf(col), key)
            .expect("db operation should be ok")
            .map(Into::into)
    }
}
