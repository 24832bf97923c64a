//! Block application.
//!
//! `Validator` is the seam between the snapshot machinery and the protocol:
//! re-executing a block against its predecessor context yields the next
//! context and the validation record. `ReplayValidator` is the node's
//! deterministic state transition.

use thiserror::Error;
use vx_context::{Context, ContextIndex};
use vx_types::block::operations_merkle_root;
use vx_types::{BlockHeader, ChainId, CommitInfo, ContextHash, Operation, TestChainStatus};

/// Operations older than this many blocks can no longer be included.
pub const DEFAULT_OPERATIONS_TTL: i32 = 60;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub message: Option<String>,
    pub max_operations_ttl: i32,
    pub last_allowed_fork_level: i32,
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub validation_result: ValidationResult,
    pub block_metadata: Vec<u8>,
    /// Per pass, per operation.
    pub ops_metadata: Vec<Vec<Vec<u8>>>,
    pub forking_testchain: bool,
    pub context_hash: ContextHash,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("block {level} carries {got} operation passes, header declares {declared}")]
    WrongValidationPasses { level: i32, declared: u8, got: usize },
    #[error("block {level} operations do not match the header commitment")]
    InvalidOperationsHash { level: i32 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait Validator {
    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        index: &ContextIndex,
        chain_id: &ChainId,
        max_operations_ttl: i32,
        predecessor_header: &BlockHeader,
        predecessor_context: Context,
        block_header: &BlockHeader,
        operations: &[Vec<Operation>],
    ) -> Result<ApplyResult, ValidationError>;
}

/// The deterministic state transition of a vertex node: every operation's
/// payload lands in the context under its hash, the block level is
/// recorded, and the commit metadata is derived from the header so a
/// re-application reproduces the context hash bit for bit.
pub struct ReplayValidator;

impl ReplayValidator {
    fn protocol_of(
        index: &ContextIndex,
        predecessor_header: &BlockHeader,
        block_header: &BlockHeader,
    ) -> Result<vx_types::ProtocolHash, ValidationError> {
        // A 32-byte protocol_data payload names the protocol activated by
        // this block; anything else carries the predecessor's forward.
        if block_header.protocol_data.len() == 32 {
            let mut raw = [0u8; 32];
            raw.copy_from_slice(&block_header.protocol_data);
            return Ok(raw.into());
        }
        let commit = index
            .commit_record(&predecessor_header.context)
            .map_err(ValidationError::Other)?
            .ok_or_else(|| {
                anyhow::anyhow!("unknown predecessor context {}", predecessor_header.context)
            })?;
        Ok(commit.protocol)
    }
}

impl Validator for ReplayValidator {
    fn apply(
        &self,
        index: &ContextIndex,
        _chain_id: &ChainId,
        _max_operations_ttl: i32,
        predecessor_header: &BlockHeader,
        predecessor_context: Context,
        block_header: &BlockHeader,
        operations: &[Vec<Operation>],
    ) -> Result<ApplyResult, ValidationError> {
        let level = block_header.level;
        if operations.len() != block_header.validation_passes as usize {
            return Err(ValidationError::WrongValidationPasses {
                level,
                declared: block_header.validation_passes,
                got: operations.len(),
            });
        }
        if operations_merkle_root(operations) != block_header.operations_hash {
            return Err(ValidationError::InvalidOperationsHash { level });
        }

        let protocol = Self::protocol_of(index, predecessor_header, block_header)?;

        let mut context = predecessor_context;
        context.insert(b"level".to_vec(), level.to_be_bytes().to_vec());
        context.insert(b"protocol".to_vec(), protocol.as_slice().to_vec());
        let mut ops_metadata = Vec::with_capacity(operations.len());
        for ops in operations {
            let mut pass_metadata = Vec::with_capacity(ops.len());
            for op in ops {
                let mut key = b"ops/".to_vec();
                key.extend_from_slice(op.hash().as_slice());
                context.insert(key, op.data.clone());
                pass_metadata.push(Vec::new());
            }
            ops_metadata.push(pass_metadata);
        }

        let message = format!("lvl {}", level);
        let context_hash = index
            .commit(
                CommitInfo {
                    author: "vertex".into(),
                    timestamp: block_header.timestamp,
                    message: message.clone(),
                },
                vec![predecessor_header.context],
                protocol,
                TestChainStatus::NotRunning,
                &context,
            )
            .map_err(ValidationError::Other)?;

        let max_operations_ttl = level.min(DEFAULT_OPERATIONS_TTL);
        Ok(ApplyResult {
            validation_result: ValidationResult {
                message: Some(message.clone()),
                max_operations_ttl,
                last_allowed_fork_level: (level - max_operations_ttl).max(0),
            },
            block_metadata: message.into_bytes(),
            ops_metadata,
            forking_testchain: false,
            context_hash,
        })
    }
}
