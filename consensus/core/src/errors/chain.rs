use super::{difficulty::DifficultyError, invariant::InvariantViolation};
use pink_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block {0} is already known")]
    DuplicateBlock(Hash),

    #[error("block {0} references unknown parent {1}")]
    UnknownParent(Hash, Hash),

    #[error("the block index already holds a genesis block")]
    GenesisAlreadyInitialized,

    #[error("the block index holds no genesis block yet")]
    MissingGenesis,

    #[error("genesis block {0} must reference the zero hash as parent")]
    GenesisWithParent(Hash),

    #[error("block {0} has bits {1:#010x}, expected {2:#010x}")]
    UnexpectedDifficulty(Hash, u32, u32),

    #[error("block {0} has an invalid target {1:#010x}")]
    InvalidTarget(Hash, u32),

    #[error("block {0} does not satisfy its proof of work target")]
    InvalidProofOfWork(Hash),

    #[error(transparent)]
    Difficulty(#[from] DifficultyError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl ChainError {
    /// Fatal errors indicate a corrupted block index; everything else is a validation
    /// failure of the offered block which the caller may simply reject.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Invariant(_) => true,
            Self::Difficulty(err) => err.is_fatal(),
            _ => false,
        }
    }
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;
