//! Skip-list ancestor tables.
//!
//! Each stored block gets a list of `(rank, hash)` entries pointing at its
//! ancestors 1, 2, 4, ... levels below, so ancestor lookup is O(log n)
//! hops. Genesis is a legitimate predecessor when the history starts right
//! after it.

use vx_types::BlockHash;

/// Ancestor table of `hashes[index]`, where `hashes` is the history's
/// hashes oldest to newest and `oldest_level` the level of `hashes[0]`.
pub fn predecessor_table(
    hashes: &[BlockHash],
    index: usize,
    oldest_level: i32,
    genesis: &BlockHash,
) -> Vec<(u8, BlockHash)> {
    let mut table = Vec::new();
    let index = index as isize;
    let mut rank = 0u8;
    let mut distance = 1isize;
    loop {
        if index - distance >= 0 {
            table.push((rank, hashes[(index - distance) as usize]));
        } else {
            if oldest_level == 1 && index - distance == -1 {
                table.push((rank, *genesis));
            }
            break;
        }
        rank += 1;
        distance *= 2;
    }
    table
}
