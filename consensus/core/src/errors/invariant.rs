use pink_hashes::Hash;
use thiserror::Error;

/// A broken block-index graph. Raised where continuing would mean reasoning over a
/// corrupted structure, so it is never treated as an ordinary validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("block {0} at height {1} has no parent link")]
    MissingParent(Hash, u64),

    #[error("blocks {0} and {1} do not meet at a common genesis")]
    NoCommonAncestor(Hash, Hash),

    #[error("active chain entry at height {0} holds block {1} whose height is {2}")]
    ChainHeightMismatch(u64, Hash, u64),

    #[error("block id {0} is not present in the block index")]
    UnknownBlockId(u32),
}

pub type InvariantResult<T> = std::result::Result<T, InvariantViolation>;
