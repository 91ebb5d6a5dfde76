use pink_consensus_core::{Hash, config::params::Params};
use pink_math::Uint256;

/// Decodes `bits` into a proof-of-work target, rejecting negative, zero and overflowing
/// encodings as well as targets easier than the proof-of-work limit
pub fn pow_target(bits: u32, params: &Params) -> Option<Uint256> {
    Uint256::checked_from_compact_target_bits(bits).filter(|target| *target <= params.pow.limit)
}

/// The proof hash, read as a little-endian number, must be less than or equal to the claimed target.
pub fn check_proof_of_work(proof_hash: &Hash, bits: u32, params: &Params) -> bool {
    pow_target(bits, params).is_some_and(|target| Uint256::from_le_bytes(proof_hash.as_bytes()) <= target)
}
