//! Types shared by every consensus component: headers and their hashing seam, block
//! kinds, locators, network parameters and the error taxonomy.

pub mod blockkind;
pub mod config;
pub mod errors;
pub mod header;
pub mod locator;
pub mod networktype;

pub use pink_hashes::{Hash, ZERO_HASH};

/// Accumulated chain trust of a block
pub type ChainTrust = pink_math::Uint256;

/// Block height on a single chain
pub type BlockHeight = u64;
