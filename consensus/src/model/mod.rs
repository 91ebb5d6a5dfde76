pub mod chain;
pub mod index;
