mod readonly;
pub mod schema;
mod store_impl;
pub mod traits;
pub mod transaction;

pub use readonly::StoreReadonly;
pub use store_impl::Store;
pub use transaction::StoreTransaction;
