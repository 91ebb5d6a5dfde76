//!
//! Per-block trust scoring, the stake trust baseline and chain comparison helpers
//!
use super::skiplist::expect_ancestor;
use crate::model::{
    chain::ActiveChain,
    index::{BlockId, BlockIndex, BlockIndexNode},
};
use parking_lot::Mutex;
use pink_consensus_core::{
    BlockHeight,
    blockkind::BlockKind,
    config::params::{Params, STAKE_TRUST_WINDOW, STALE_CANDIDATE_AGE, STALE_TARGET_MULTIPLIER},
    errors::{
        difficulty::{DifficultyError, DifficultyResult},
        invariant::{InvariantResult, InvariantViolation},
    },
};
use pink_core::log::{debug, error, info};
use pink_math::Uint256;

/// Work represented by a single block with compact target `bits`: `2^256 / (target + 1)`.
/// Zero for targets that are negative, overflowing or zero, which callers must reject.
pub fn block_proof(bits: u32) -> Uint256 {
    match Uint256::checked_from_compact_target_bits(bits) {
        Some(target) => target.inverse_plus_one(),
        None => Uint256::ZERO,
    }
}

/// Stake trust baseline: the hardest stake target seen in a past window and the height
/// the window was anchored at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeTrustBaseline {
    pub target: Uint256,
    pub bits: u32,
    pub height: BlockHeight,
}

/// Owner of the stake trust baseline. `get_or_recompute` runs as one critical section.
#[derive(Debug, Default)]
pub struct StakeTrustCache {
    baseline: Mutex<Option<StakeTrustBaseline>>,
}

impl StakeTrustCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<StakeTrustBaseline> {
        *self.baseline.lock()
    }

    pub fn reset(&self) {
        self.baseline.lock().take();
    }

    /// Returns the baseline target valid for a block built on `base`, recomputing it when
    /// unset or when `base` is more than a window past the cached anchor.
    pub fn get_or_recompute(&self, index: &BlockIndex, base: BlockId) -> InvariantResult<Uint256> {
        let mut baseline = self.baseline.lock();
        let base_height = index.node(base)?.height;
        if let Some(cached) = *baseline
            && !cached.target.is_zero()
            && base_height <= cached.height + STAKE_TRUST_WINDOW
        {
            return Ok(cached.target);
        }
        let computed = Self::compute(index, base)?;
        info!("Stake trust baseline recomputed at height {}: bits {:#010x}", computed.height, computed.bits);
        *baseline = Some(computed);
        Ok(computed.target)
    }

    /// Anchors at the closest window multiple at or below `base`, steps one more window
    /// back and takes the lowest non-zero bits over the window ending there. Short chains
    /// stop at genesis.
    fn compute(index: &BlockIndex, base: BlockId) -> InvariantResult<StakeTrustBaseline> {
        let base_height = index.node(base)?.height;
        let anchor_height = base_height - base_height % STAKE_TRUST_WINDOW;
        let start = expect_ancestor(index, base, anchor_height.saturating_sub(STAKE_TRUST_WINDOW))?;

        let mut best_bits = 0u32;
        let mut current = Some(start);
        for _ in 0..STAKE_TRUST_WINDOW {
            let Some(id) = current else { break };
            let node = index.node(id)?;
            if node.bits < best_bits || best_bits == 0 {
                best_bits = node.bits;
            }
            current = node.parent;
        }
        Ok(StakeTrustBaseline { target: Uint256::from_compact_target_bits(best_bits), bits: best_bits, height: anchor_height })
    }
}

/// The fields of a block needed to score it, whether or not it is in the index yet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrustCandidate {
    pub parent: Option<BlockId>,
    pub time: u32,
    pub bits: u32,
    pub kind: BlockKind,
}

impl From<&BlockIndexNode> for TrustCandidate {
    fn from(node: &BlockIndexNode) -> Self {
        Self { parent: node.parent, time: node.time, bits: node.bits, kind: node.kind }
    }
}

pub struct ChainTrustManager {
    params: Params,
    stake_trust: StakeTrustCache,
}

impl ChainTrustManager {
    pub fn new(params: &Params) -> Self {
        Self { params: params.clone(), stake_trust: StakeTrustCache::new() }
    }

    pub fn stake_trust_cache(&self) -> &StakeTrustCache {
        &self.stake_trust
    }

    /// Trust contributed by a single block.
    ///
    /// Before the trust upgrade this is the block proof. Afterwards a new candidate that is
    /// more than [`STALE_CANDIDATE_AGE`] older than the tip and builds below the tip's parent
    /// is scored as if its target were [`STALE_TARGET_MULTIPLIER`] times easier, and stake
    /// blocks add the inverse of the stake trust baseline.
    pub fn block_trust(
        &self,
        index: &BlockIndex,
        chain: &ActiveChain,
        candidate: TrustCandidate,
        is_new: bool,
    ) -> InvariantResult<Uint256> {
        let Some(mut target) = Uint256::checked_from_compact_target_bits(candidate.bits) else {
            return Ok(Uint256::ZERO);
        };
        if !self.params.is_trust_upgrade_active(candidate.time) {
            return Ok(target.inverse_plus_one());
        }
        let Some(parent) = candidate.parent else {
            return Ok(target.inverse_plus_one());
        };

        if is_new && self.is_stale_candidate(index, chain, parent, candidate.time)? {
            debug!("Stale candidate at time {} scored with a {}x easier target", candidate.time, STALE_TARGET_MULTIPLIER);
            target = target.overflowing_mul_u64(STALE_TARGET_MULTIPLIER).0;
        }

        let mut trust = target.inverse_plus_one();
        if candidate.kind.is_proof_of_stake() {
            let stake_target = self.stake_trust.get_or_recompute(index, parent)?;
            if !stake_target.is_zero() {
                trust = trust.overflowing_add(stake_target.inverse_plus_one()).0;
            }
        }
        Ok(trust)
    }

    /// Trust of a block already in the index, scored as a known (not new) block
    pub fn block_trust_of(&self, index: &BlockIndex, chain: &ActiveChain, id: BlockId) -> InvariantResult<Uint256> {
        self.block_trust(index, chain, index.node(id)?.into(), false)
    }

    fn is_stale_candidate(&self, index: &BlockIndex, chain: &ActiveChain, parent: BlockId, time: u32) -> InvariantResult<bool> {
        let Some(tip) = chain.tip() else { return Ok(false) };
        let tip_node = index.node(tip)?;
        let Some(tip_parent) = tip_node.parent else { return Ok(false) };
        Ok(index.node(parent)?.height < index.node(tip_parent)?.height
            && (time as i64) < tip_node.block_time() - STALE_CANDIDATE_AGE as i64)
    }

    /// Difference in accumulated trust between `to` and `from`, expressed as the time the
    /// network would need to produce it at the tip's difficulty. Saturates at `±i64::MAX`.
    pub fn block_proof_equivalent_time(
        &self,
        index: &BlockIndex,
        to: BlockId,
        from: BlockId,
        tip: BlockId,
    ) -> DifficultyResult<i64> {
        block_proof_equivalent_time(index, to, from, tip, self.params.pow.target_spacing)
    }
}

pub fn block_proof_equivalent_time(
    index: &BlockIndex,
    to: BlockId,
    from: BlockId,
    tip: BlockId,
    target_spacing: i64,
) -> DifficultyResult<i64> {
    let (to, from, tip) = (index.node(to)?, index.node(from)?, index.node(tip)?);
    let (delta, sign) = if to.chain_trust > from.chain_trust {
        (to.chain_trust - from.chain_trust, 1)
    } else {
        (from.chain_trust - to.chain_trust, -1)
    };
    let tip_proof = block_proof(tip.bits);
    if tip_proof.is_zero() {
        return Err(DifficultyError::InvalidCompactTarget(tip.bits));
    }
    let time = delta.overflowing_mul_u64(target_spacing as u64).0 / tip_proof;
    if time.bits() > 63 {
        return Ok(sign * i64::MAX);
    }
    Ok(sign * time.as_u64() as i64)
}

/// The most recent block both `a` and `b` descend from. Branches that do not meet at a
/// shared genesis are a fatal violation.
pub fn last_common_ancestor(index: &BlockIndex, a: BlockId, b: BlockId) -> InvariantResult<BlockId> {
    let (height_a, height_b) = (index.node(a)?.height, index.node(b)?.height);
    let mut a = if height_a > height_b { expect_ancestor(index, a, height_b)? } else { a };
    let mut b = if height_b > height_a { expect_ancestor(index, b, height_a)? } else { b };

    while a != b {
        match (index.node(a)?.parent, index.node(b)?.parent) {
            (Some(parent_a), Some(parent_b)) => {
                a = parent_a;
                b = parent_b;
            }
            _ => {
                let (hash_a, hash_b) = (index.node(a)?.hash, index.node(b)?.hash);
                error!("Blocks {} and {} do not share a genesis", hash_a, hash_b);
                return Err(InvariantViolation::NoCommonAncestor(hash_a, hash_b));
            }
        }
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::IndexBuilder;
    use pink_consensus_core::config::params::{MAINNET_PARAMS, REGTEST_PARAMS};
    use rand::Rng;
    use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

    fn id(index: &BlockIndex, hash: u64) -> BlockId {
        index.id_of(&hash.into()).unwrap()
    }

    #[test]
    fn test_block_proof() {
        let pow_limit_bits = MAINNET_PARAMS.pow_limit_bits();
        let limit = Uint256::from_compact_target_bits(pow_limit_bits);
        let half = (limit >> 1).compact_target_bits();
        assert!(block_proof(pow_limit_bits) < block_proof(half));
        assert!(block_proof(pow_limit_bits) > Uint256::ZERO);
        assert_eq!(block_proof(0x1d00ffff), Uint256::from_u64(0x0001_0001_0001));

        // zero, negative and overflowing targets
        assert_eq!(block_proof(0), Uint256::ZERO);
        assert_eq!(block_proof(0x04800000), Uint256::ZERO);
        assert_eq!(block_proof(0x01fedcba), Uint256::ZERO);
        assert_eq!(block_proof(0xff123456), Uint256::ZERO);
    }

    fn trust_params(upgrade_time: u32) -> Params {
        let mut params = REGTEST_PARAMS;
        params.trust_upgrade_time = upgrade_time;
        params
    }

    #[test]
    fn test_block_trust_before_upgrade_is_proof() {
        let index = IndexBuilder::linear(5).build();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 5))).unwrap();
        let manager = ChainTrustManager::new(&trust_params(u32::MAX));
        let candidate = TrustCandidate { parent: Some(id(&index, 1)), time: 0, bits: 0x1e0fffff, kind: BlockKind::ProofOfStake };
        assert_eq!(manager.block_trust(&index, &chain, candidate, true).unwrap(), block_proof(0x1e0fffff));
        let candidate = TrustCandidate { bits: 0x04800000, ..candidate };
        assert_eq!(manager.block_trust(&index, &chain, candidate, true).unwrap(), Uint256::ZERO);
        assert!(manager.stake_trust_cache().get().is_none());
    }

    #[test]
    fn test_trust_upgrade_boundary() {
        let index = IndexBuilder::linear(5).build();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 5))).unwrap();
        let upgrade_time = index.node(id(&index, 5)).unwrap().time;
        let manager = ChainTrustManager::new(&trust_params(upgrade_time));

        let bits = 0x1e0fffff;
        let candidate = TrustCandidate { parent: Some(id(&index, 5)), time: upgrade_time, bits, kind: BlockKind::ProofOfStake };
        // Still the plain proof at the upgrade time itself
        assert_eq!(manager.block_trust(&index, &chain, candidate, false).unwrap(), block_proof(bits));
        assert!(manager.stake_trust_cache().get().is_none());

        // One second later the genesis-only baseline is added
        let candidate = TrustCandidate { time: upgrade_time + 1, ..candidate };
        let baseline = Uint256::from_compact_target_bits(index.node(id(&index, 1)).unwrap().bits).inverse_plus_one();
        assert_eq!(manager.block_trust(&index, &chain, candidate, false).unwrap(), block_proof(bits) + baseline);
    }

    #[test]
    fn test_stale_candidate_penalty() {
        let index = IndexBuilder::linear(10).build();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 10))).unwrap();
        let tip_time = index.node(id(&index, 10)).unwrap().time;
        let manager = ChainTrustManager::new(&trust_params(0));

        let bits = 0x1e0fffff;
        let target = Uint256::from_compact_target_bits(bits);
        let penalized = (target * 10u64).inverse_plus_one();
        let normal = target.inverse_plus_one();
        assert!(penalized < normal);

        // Built on height 4 (below the tip's parent at height 8), 601 seconds older
        let candidate = TrustCandidate { parent: Some(id(&index, 5)), time: tip_time - 601, bits, kind: BlockKind::ProofOfWork };
        assert_eq!(manager.block_trust(&index, &chain, candidate, true).unwrap(), penalized);
        // Known blocks are never penalized
        assert_eq!(manager.block_trust(&index, &chain, candidate, false).unwrap(), normal);
        // Exactly 600 seconds older is still fine
        let candidate = TrustCandidate { time: tip_time - 600, ..candidate };
        assert_eq!(manager.block_trust(&index, &chain, candidate, true).unwrap(), normal);
        // Building on the tip's parent is a regular competitor
        let candidate = TrustCandidate { parent: Some(id(&index, 9)), time: tip_time - 6000, ..candidate };
        assert_eq!(manager.block_trust(&index, &chain, candidate, true).unwrap(), normal);
    }

    #[test]
    fn test_stake_trust_baseline() {
        // 3000 blocks; bits vary with height so the window minimum is identifiable
        let mut builder = IndexBuilder::new();
        let bits_at = |height: u64| 0x1e0f0000 + ((height * 7919) % 0xffff) as u32;
        builder.add_block_with(1.into(), 0.into(), 1000, bits_at(0), BlockKind::ProofOfWork);
        for hash in 2..=3000u64 {
            builder.add_block_with(hash.into(), (hash - 1).into(), 1000 + hash as u32 * 60, bits_at(hash - 1), BlockKind::ProofOfStake);
        }
        let index = builder.build();
        let cache = StakeTrustCache::new();

        // Base at height 2500: anchor 2048, window covers heights 1024 down to 1
        let base = id(&index, 2501);
        let expected_bits = (1..=1024u64).map(bits_at).min().unwrap();
        let target = cache.get_or_recompute(&index, base).unwrap();
        assert_eq!(target, Uint256::from_compact_target_bits(expected_bits));
        assert_eq!(cache.get(), Some(StakeTrustBaseline { target, bits: expected_bits, height: 2048 }));

        // Within a window of the anchor the cached value is kept, even for other branches
        assert_eq!(cache.get_or_recompute(&index, id(&index, 3000)).unwrap(), target);
        assert_eq!(cache.get_or_recompute(&index, id(&index, 10)).unwrap(), target);
        assert_eq!(cache.get().unwrap().height, 2048);

        // Below two windows the sample start clamps to genesis
        cache.reset();
        let short_base = id(&index, 700);
        assert_eq!(cache.get_or_recompute(&index, short_base).unwrap(), Uint256::from_compact_target_bits(bits_at(0)));
        assert_eq!(cache.get().unwrap().height, 0);
        // Height 699 is still within one window of anchor 0, height 1025 is not
        cache.get_or_recompute(&index, id(&index, 1025)).unwrap();
        assert_eq!(cache.get().unwrap().height, 0);
        cache.get_or_recompute(&index, id(&index, 1026)).unwrap();
        assert_eq!(cache.get().unwrap().height, 1024);
    }

    #[test]
    fn test_stake_trust_baseline_skips_zero_bits() {
        let mut builder = IndexBuilder::new();
        let bits_at = |height: u64| match height {
            // First block of the sampled window
            1024 => 0,
            _ => 0x1e0f0000 + ((height * 104729) % 0xffff) as u32,
        };
        builder.add_block_with(1.into(), 0.into(), 1000, bits_at(0), BlockKind::ProofOfWork);
        for hash in 2..=2100u64 {
            builder.add_block_with(hash.into(), (hash - 1).into(), 1000 + hash as u32 * 60, bits_at(hash - 1), BlockKind::ProofOfStake);
        }
        let index = builder.build();
        let cache = StakeTrustCache::new();

        // Base at height 2050: anchor 2048, the scan starts at height 1024
        let expected_bits = (1..=1023u64).map(bits_at).min().unwrap();
        assert_ne!(expected_bits, 0);
        let target = cache.get_or_recompute(&index, id(&index, 2051)).unwrap();
        assert_eq!(target, Uint256::from_compact_target_bits(expected_bits));
        assert_eq!(cache.get().unwrap().bits, expected_bits);
    }

    #[test]
    fn test_stake_block_trust_adds_baseline() {
        let mut builder = IndexBuilder::new();
        builder.add_block_with(1.into(), 0.into(), 1000, 0x1e0fffff, BlockKind::ProofOfWork);
        for hash in 2..=40u64 {
            builder.add_block_with(hash.into(), (hash - 1).into(), 1000 + hash as u32 * 60, 0x1e0fffff, BlockKind::ProofOfWork);
        }
        let index = builder.build();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 40))).unwrap();
        let manager = ChainTrustManager::new(&trust_params(0));

        let bits = 0x1f3fffff;
        let candidate = TrustCandidate { parent: Some(id(&index, 40)), time: 1000 + 41 * 60, bits, kind: BlockKind::ProofOfStake };
        let stake_trust = manager.block_trust(&index, &chain, candidate, true).unwrap();
        let baseline = Uint256::from_compact_target_bits(0x1e0fffff).inverse_plus_one();
        assert_eq!(stake_trust, block_proof(bits) + baseline);

        let work_trust = manager.block_trust(&index, &chain, TrustCandidate { kind: BlockKind::ProofOfWork, ..candidate }, true).unwrap();
        assert_eq!(work_trust, block_proof(bits));
        assert_eq!(manager.block_trust_of(&index, &chain, id(&index, 40)).unwrap(), block_proof(0x1e0fffff));
    }

    #[test]
    fn test_block_proof_equivalent_time() {
        // Equal bits on every block, so each block adds one tip proof worth of trust
        let index = IndexBuilder::linear(100).build();
        let (genesis, tip) = (id(&index, 1), id(&index, 100));
        let spacing = REGTEST_PARAMS.pow.target_spacing;
        assert_eq!(block_proof_equivalent_time(&index, tip, genesis, tip, spacing), Ok(99 * spacing));
        assert_eq!(block_proof_equivalent_time(&index, genesis, tip, tip, spacing), Ok(-99 * spacing));
        assert_eq!(block_proof_equivalent_time(&index, tip, tip, tip, spacing), Ok(0));

        // A tip with an invalid target cannot be used as the yardstick
        let mut builder = IndexBuilder::new();
        builder.add_block_with(1.into(), 0.into(), 0, 0x1d00ffff, BlockKind::ProofOfWork);
        builder.add_block_with(2.into(), 1.into(), 0, 0, BlockKind::ProofOfWork);
        let index = builder.build();
        let (a, b) = (id(&index, 1), id(&index, 2));
        assert_eq!(block_proof_equivalent_time(&index, a, b, b, spacing), Err(DifficultyError::InvalidCompactTarget(0)));

        // A very hard block measured against a very easy tip saturates
        let mut builder = IndexBuilder::new();
        builder.add_block_with(1.into(), 0.into(), 0, 0x207fffff, BlockKind::ProofOfWork);
        builder.add_block_with(2.into(), 1.into(), 0, 0x07000001, BlockKind::ProofOfWork);
        let index = builder.build();
        let (easy, hard) = (id(&index, 1), id(&index, 2));
        assert_eq!(block_proof_equivalent_time(&index, hard, easy, easy, spacing), Ok(i64::MAX));
        assert_eq!(block_proof_equivalent_time(&index, easy, hard, easy, spacing), Ok(-i64::MAX));
    }

    #[test]
    fn test_last_common_ancestor() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut builder = IndexBuilder::new();
        builder.add_block(1.into(), 0.into());
        for i in 2..=1500u64 {
            let parent = i - rng.gen_range(1..=20.min(i - 1));
            builder.add_block(i.into(), parent.into());
        }
        let index = builder.build();

        for _ in 0..500 {
            let a = BlockId::new(rng.gen_range(0..1500));
            let b = BlockId::new(rng.gen_range(0..1500));
            let ancestor = last_common_ancestor(&index, a, b).unwrap();
            assert_eq!(last_common_ancestor(&index, b, a).unwrap(), ancestor);
            let ancestor_height = index.node(ancestor).unwrap().height;
            assert!(ancestor_height <= index.node(a).unwrap().height.min(index.node(b).unwrap().height));
            assert_eq!(expect_ancestor(&index, a, ancestor_height).unwrap(), ancestor);
            assert_eq!(expect_ancestor(&index, b, ancestor_height).unwrap(), ancestor);
        }
        assert_eq!(last_common_ancestor(&index, id(&index, 77), id(&index, 77)), Ok(id(&index, 77)));

        // A second root makes the branches disjoint
        let mut builder = IndexBuilder::linear(5);
        builder.add_block(100.into(), 0.into()).add_block(101.into(), 100.into());
        let index = builder.build();
        assert!(matches!(
            last_common_ancestor(&index, id(&index, 5), id(&index, 101)),
            Err(InvariantViolation::NoCommonAncestor(_, _))
        ));
    }
}
