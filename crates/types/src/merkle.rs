use merkle_cbt::{merkle_tree::Merge, CBMT as ExCBMT};
use vx_hash::blake2b::new_blake2b;

pub struct MergeHash;

impl Merge for MergeHash {
    type Item = [u8; 32];
    fn merge(left: &Self::Item, right: &Self::Item) -> Self::Item {
        let mut hash = [0u8; 32];
        let mut blake2b = new_blake2b();
        blake2b.update(&left[..]);
        blake2b.update(&right[..]);
        blake2b.finalize(&mut hash);
        hash
    }
}

pub type CBMT = ExCBMT<[u8; 32], MergeHash>;

/// Compute merkle root from leaves; the empty tree has the zero root.
pub fn calculate_merkle_root(leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    CBMT::build_merkle_root(&leaves)
}
