//! Hash newtypes.
//!
//! Every hash family gets its own wrapper so a block hash can never be
//! assigned where an operation hash is expected. Equality and ordering are
//! byte-wise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vx_hash::blake2b::blake2b_256;

use crate::merkle::calculate_merkle_root;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hash literal {0}")]
pub struct HashParseError(String);

macro_rules! impl_hash {
    ($name:ident) => {
        #[derive(
            Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name([u8; 32]);

        impl $name {
            pub const fn zero() -> Self {
                $name([0u8; 32])
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0[..]
            }

            pub fn from_slice(slice: &[u8]) -> Result<Self, HashParseError> {
                if slice.len() != 32 {
                    return Err(HashParseError(faster_hex::hex_string(slice)));
                }
                let mut inner = [0u8; 32];
                inner.copy_from_slice(slice);
                Ok($name(inner))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(v: [u8; 32]) -> Self {
                $name(v)
            }
        }

        impl From<$name> for [u8; 32] {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", faster_hex::hex_string(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != 64 {
                    return Err(HashParseError(s.to_string()));
                }
                let mut inner = [0u8; 32];
                faster_hex::hex_decode(s.as_bytes(), &mut inner)
                    .map_err(|_| HashParseError(s.to_string()))?;
                Ok($name(inner))
            }
        }
    };
}

impl_hash!(BlockHash);
impl_hash!(ContextHash);
impl_hash!(OperationHash);
impl_hash!(OperationListHash);
impl_hash!(OperationListListHash);
impl_hash!(ProtocolHash);

impl OperationListHash {
    /// Merkle root over the operation hashes of one validation pass.
    pub fn compute(hashes: &[OperationHash]) -> Self {
        let leaves = hashes.iter().map(|h| h.0).collect();
        OperationListHash(calculate_merkle_root(leaves))
    }
}

impl OperationListListHash {
    /// Merkle root over the per-pass roots, lowest pass first.
    pub fn compute(lists: &[OperationListHash]) -> Self {
        let leaves = lists.iter().map(|h| h.0).collect();
        OperationListListHash(calculate_merkle_root(leaves))
    }
}

/// Chain identifier, derived from the genesis block hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId([u8; 4]);

impl ChainId {
    pub fn of_block_hash(genesis: &BlockHash) -> Self {
        let digest = blake2b_256(genesis.as_slice());
        let mut inner = [0u8; 4];
        inner.copy_from_slice(&digest[..4]);
        ChainId(inner)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", faster_hex::hex_string(&self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChainId({})", self)
    }
}
