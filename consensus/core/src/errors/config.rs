use crate::blockkind::BlockKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration: {0} target spacing must be positive")]
    NonPositiveSpacing(BlockKind),

    #[error("Configuration: {0} target timespan {1} is shorter than its spacing {2}")]
    TimespanBelowSpacing(BlockKind, i64, i64),

    #[error("Configuration: {0} target limit must be non-zero")]
    ZeroLimit(BlockKind),

    #[error("Configuration: flash stake hour {0} is not a valid hour of day")]
    InvalidFlashHour(u32),

    #[error("Configuration: invalid network type: {0}")]
    InvalidNetworkType(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
