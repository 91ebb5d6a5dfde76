use super::invariant::InvariantViolation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("compact target {0:#010x} is negative, overflowing or zero")]
    InvalidCompactTarget(u32),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl DifficultyError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

pub type DifficultyResult<T> = std::result::Result<T, DifficultyError>;
