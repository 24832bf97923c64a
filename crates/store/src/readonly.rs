use std::path::Path;

use anyhow::Result;
use rocksdb::{Options, DB};

use crate::schema::{Col, COLUMNS};
use crate::traits::{chain_store::ChainStore, kv_store::KVStoreRead};

/// Read-only database handle. Lets export run against a live node without
/// taking the write lock.
pub struct StoreReadonly {
    db: DB,
}

impl StoreReadonly {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let opts = Options::default();
        let cf_names = (0..COLUMNS).map(|c| c.to_string());
        let db = DB::open_cf_for_read_only(&opts, path, cf_names, false)?;
        Ok(StoreReadonly { db })
    }

    fn cf(&self, col: Col) -> &rocksdb::ColumnFamily {
        self.db.cf_handle(col).expect("unknown column")
    }
}

impl ChainStore for StoreReadonly {}

impl KVStoreRead for StoreReadonly {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>> {
        self.db
            .get_cf(self.cf(col), key)
            .expect("db operation should be ok")
            .map(Into::into)
    }
}
