//! The schema include constants define the low level database column families.

/// Column families alias type
pub type Col = &'static str;
/// Total column number
pub const COLUMNS: u32 = 9;
/// Column store meta data
pub const COLUMN_META: Col = "0";
/// Column store block header, keyed by block hash
pub const COLUMN_BLOCK_HEADER: Col = "1";
/// Column store block validation record, keyed by block hash
pub const COLUMN_BLOCK_CONTENTS: Col = "2";
/// Column store operations, keyed by block hash and pass index
pub const COLUMN_OPERATIONS: Col = "3";
/// Column store operation hashes, keyed by block hash and pass index
pub const COLUMN_OPERATION_HASHES: Col = "4";
/// Column store operations metadata, keyed by block hash and pass index
pub const COLUMN_OPERATIONS_METADATA: Col = "5";
/// Column store skip-list ancestors, keyed by block hash and rank
pub const COLUMN_PREDECESSORS: Col = "6";
/// Column store canonical successor links, keyed by predecessor hash
pub const COLUMN_IN_MAIN_BRANCH: Col = "7";
/// Column store activated protocols, keyed by proto level
pub const COLUMN_PROTOCOL: Col = "8";

/// META_CURRENT_HEAD_KEY tracks the latest known best block hash
pub const META_CURRENT_HEAD_KEY: &[u8] = b"CURRENT_HEAD";
/// Heads the node knows about
pub const META_KNOWN_HEADS_KEY: &[u8] = b"KNOWN_HEADS";
/// Latest finalized and trusted block header
pub const META_CHECKPOINT_KEY: &[u8] = b"CHECKPOINT";
/// Oldest block with full metadata
pub const META_SAVE_POINT_KEY: &[u8] = b"SAVE_POINT";
/// Oldest block known at all
pub const META_CABOOSE_KEY: &[u8] = b"CABOOSE";
/// History retention mode of this node
pub const META_HISTORY_MODE_KEY: &[u8] = b"HISTORY_MODE";
/// Chain identifier
pub const META_CHAIN_ID_KEY: &[u8] = b"CHAIN_ID";
/// Genesis description this database was created from
pub const META_GENESIS_KEY: &[u8] = b"GENESIS";
