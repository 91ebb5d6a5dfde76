pub mod chain;
pub mod config;
pub mod difficulty;
pub mod invariant;
