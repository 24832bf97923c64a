use anyhow::Result;

use crate::schema::Col;

pub trait KVStoreRead {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>>;
}

pub trait KVStoreWrite {
    fn insert_raw(&mut self, col: Col, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, col: Col, key: &[u8]) -> Result<()>;
}

pub trait KVStore: KVStoreRead + KVStoreWrite {}

impl<T: KVStoreRead> KVStoreRead for &T {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>> {
        (**self).get(col, key)
    }
}

impl<T: KVStoreRead> KVStoreRead for &mut T {
    fn get(&self, col: Col, key: &[u8]) -> Option<Box<[u8]>> {
        (**self).get(col, key)
    }
}
