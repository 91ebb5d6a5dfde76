//!
//! Next-target computation: the per-block exponential moving retarget in its two
//! height-gated generations, and the legacy periodic proof-of-work retarget.
//!
use super::skiplist::expect_ancestor;
use crate::model::index::{BlockId, BlockIndex, BlockIndexNode};
use pink_consensus_core::{
    BlockHeight,
    blockkind::BlockKind,
    config::params::{ForkActivation, MiningModeParams, Params, STAKE_SPACING_MODULO},
    errors::invariant::InvariantResult,
};
use pink_core::log::trace;
use pink_math::Uint256;
use std::fmt::Display;

/// Walks back from `id` to the closest block mined with the requested proof type, stopping
/// at genesis
pub fn last_block_index(index: &BlockIndex, id: BlockId, proof_of_stake: bool) -> InvariantResult<BlockId> {
    let mut current = id;
    loop {
        let node = index.node(current)?;
        match node.parent {
            Some(parent) if node.is_proof_of_stake() != proof_of_stake => current = parent,
            _ => return Ok(current),
        }
    }
}

/// Walks back from `id` to the closest stake block of the requested sub-mode, stopping at
/// genesis.
///
/// Starting below `same_sub_mode_lookup_activation` the walk first looks for a block whose
/// time has the requested flash state and then for the next stake block, which can land on
/// a block of the other sub-mode. From the activation on it matches the recorded kind.
pub fn last_block_index_same_sub_mode(index: &BlockIndex, params: &Params, id: BlockId, flash: bool) -> InvariantResult<BlockId> {
    let mut current = id;
    if params.same_sub_mode_lookup_activation.is_active(index.node(id)?.height) {
        walk_back_while(index, &mut current, |node| !node.kind.is_stake_sub_mode(flash))?;
    } else {
        walk_back_while(index, &mut current, |node| params.is_flash_stake(node.time) != flash)?;
        walk_back_while(index, &mut current, |node| !node.is_proof_of_stake())?;
    }
    Ok(current)
}

fn walk_back_while(index: &BlockIndex, current: &mut BlockId, pred: impl Fn(&BlockIndexNode) -> bool) -> InvariantResult<()> {
    loop {
        let node = index.node(*current)?;
        match node.parent {
            Some(parent) if pred(node) => *current = parent,
            _ => return Ok(()),
        }
    }
}

/// Exponential moving retarget toward `target_spacing`:
///
/// `prev * ((interval - 1) * spacing + 2 * actual) / ((interval + 1) * spacing)`
/// with `interval = target_timespan / target_spacing`.
///
/// The multiplier is truncated to 32 bits and the product wraps modulo 2^256, which
/// historical blocks depend on. A zero or above-limit result falls back to `limit`.
pub fn retarget(prev_target: Uint256, actual_spacing: i64, target_spacing: i64, target_timespan: i64, limit: Uint256) -> Uint256 {
    let Some(interval) = target_timespan.checked_div(target_spacing) else {
        return limit;
    };
    let multiplier = (interval - 1).wrapping_mul(target_spacing).wrapping_add(actual_spacing.wrapping_mul(2));
    let divisor = (interval + 1).wrapping_mul(target_spacing);
    if divisor == 0 {
        return limit;
    }
    let new_target = prev_target.overflowing_mul_u64(multiplier as u32 as u64).0 / divisor as u64;
    if new_target.is_zero() || new_target > limit { limit } else { new_target }
}

/// One generation of the per-block retarget rules
pub trait RetargetStrategy {
    /// Compact target required from a block of the given proof type, timed at
    /// `candidate_time` and built on `last`
    fn next_target_bits(&self, index: &BlockIndex, last: BlockId, candidate_time: u32, proof_of_stake: bool) -> InvariantResult<u32>;
}

/// First generation. Stake modes measure against their timespan, a sub-mode flip restarts
/// from the last block of the candidate's sub-mode with zero spacing, and early negative
/// spacings are replaced by the nominal one.
#[derive(Clone)]
pub struct DifficultyManagerV1 {
    params: Params,
}

impl DifficultyManagerV1 {
    pub fn new(params: &Params) -> Self {
        Self { params: params.clone() }
    }
}

impl RetargetStrategy for DifficultyManagerV1 {
    fn next_target_bits(&self, index: &BlockIndex, last: BlockId, candidate_time: u32, proof_of_stake: bool) -> InvariantResult<u32> {
        let params = &self.params;
        let kind = params.mode_kind(candidate_time, proof_of_stake);
        let mode = params.mode(kind);

        let prev = last_block_index(index, last, proof_of_stake)?;
        let prev_node = index.node(prev)?;
        let Some(prev_parent) = prev_node.parent else {
            return Ok(mode.limit_bits());
        };
        let prev_prev_node = index.node(last_block_index(index, prev_parent, proof_of_stake)?)?;
        if prev_prev_node.parent.is_none() {
            return Ok(mode.limit_bits());
        }

        let prev_flash = params.is_flash_stake(prev_node.time);
        let (spacing, flip) = match kind {
            BlockKind::FlashProofOfStake => (params.flash_pos.target_timespan, !prev_flash),
            BlockKind::ProofOfStake => (params.pos.target_timespan, prev_flash),
            BlockKind::ProofOfWork => (params.pow.target_spacing, false),
        };

        let (prev_target, mut actual_spacing) = if flip {
            let matching = last_block_index_same_sub_mode(index, params, prev, kind.is_flash_stake())?;
            (Uint256::from_compact_target_bits(index.node(matching)?.bits), 0)
        } else {
            (Uint256::from_compact_target_bits(prev_node.bits), prev_node.block_time() - prev_prev_node.block_time())
        };
        if !params.legacy_spacing_clamp_activation.is_active(prev_node.height) && actual_spacing < 0 {
            actual_spacing = spacing;
        }

        Ok(retarget(prev_target, actual_spacing, spacing, mode.target_timespan, mode.limit).compact_target_bits())
    }
}

/// Second generation. Every mode measures against its spacing, and stake sub-modes are
/// retargeted independently from their own two latest blocks.
#[derive(Clone)]
pub struct DifficultyManagerV2 {
    params: Params,
}

impl DifficultyManagerV2 {
    pub fn new(params: &Params) -> Self {
        Self { params: params.clone() }
    }
}

impl RetargetStrategy for DifficultyManagerV2 {
    fn next_target_bits(&self, index: &BlockIndex, last: BlockId, candidate_time: u32, proof_of_stake: bool) -> InvariantResult<u32> {
        let params = &self.params;
        let kind = params.mode_kind(candidate_time, proof_of_stake);
        let mode = params.mode(kind);

        let prev = last_block_index(index, last, proof_of_stake)?;
        let (prev_bits, actual_spacing) = if proof_of_stake {
            let flash = kind.is_flash_stake();
            let same_node = index.node(last_block_index_same_sub_mode(index, params, prev, flash)?)?;
            let Some(parent) = same_node.parent else {
                return Ok(mode.limit_bits());
            };
            let prev_same_node = index.node(last_block_index_same_sub_mode(index, params, parent, flash)?)?;
            // Gaps between stake periods are dropped
            (same_node.bits, (same_node.block_time() - prev_same_node.block_time()) % STAKE_SPACING_MODULO)
        } else {
            let prev_node = index.node(prev)?;
            let Some(parent) = prev_node.parent else {
                return Ok(mode.limit_bits());
            };
            let prev_prev_node = index.node(last_block_index(index, parent, false)?)?;
            (prev_node.bits, prev_node.block_time() - prev_prev_node.block_time())
        };

        let prev_target = Uint256::from_compact_target_bits(prev_bits);
        Ok(retarget(prev_target, actual_spacing, mode.target_spacing, mode.target_timespan, mode.limit).compact_target_bits())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DifficultyGeneration {
    V1,
    V2,
}

impl Display for DifficultyGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyGeneration::V1 => f.write_str("v1"),
            DifficultyGeneration::V2 => f.write_str("v2"),
        }
    }
}

/// Selects the retarget generation by the height of the block being built on
#[derive(Clone)]
pub struct DifficultyManager {
    v1: DifficultyManagerV1,
    v2: DifficultyManagerV2,
    v2_activation: ForkActivation,
}

impl DifficultyManager {
    pub fn new(params: &Params) -> Self {
        Self {
            v1: DifficultyManagerV1::new(params),
            v2: DifficultyManagerV2::new(params),
            v2_activation: params.difficulty_v2_activation,
        }
    }

    pub fn generation(&self, last_height: BlockHeight) -> DifficultyGeneration {
        if self.v2_activation.is_active(last_height) { DifficultyGeneration::V2 } else { DifficultyGeneration::V1 }
    }

    pub fn next_target_bits(&self, index: &BlockIndex, last: BlockId, candidate_time: u32, proof_of_stake: bool) -> InvariantResult<u32> {
        let generation = self.generation(index.node(last)?.height);
        let strategy: &dyn RetargetStrategy = match generation {
            DifficultyGeneration::V1 => &self.v1,
            DifficultyGeneration::V2 => &self.v2,
        };
        let bits = strategy.next_target_bits(index, last, candidate_time, proof_of_stake)?;
        trace!("Next {} target after {} at time {}: {:#010x}", generation, last, candidate_time, bits);
        Ok(bits)
    }
}

/// Proof-of-work retarget every `timespan / spacing` blocks, with the optional
/// minimum-difficulty rule between retargets
#[derive(Clone)]
pub struct PeriodicDifficultyManager {
    pow: MiningModeParams,
    interval: u64,
    allow_min_difficulty_blocks: bool,
    no_retargeting: bool,
}

impl PeriodicDifficultyManager {
    pub fn new(params: &Params) -> Self {
        Self {
            pow: params.pow,
            interval: params.difficulty_adjustment_interval().max(1) as u64,
            allow_min_difficulty_blocks: params.pow_allow_min_difficulty_blocks,
            no_retargeting: params.pow_no_retargeting,
        }
    }

    pub fn next_work_required(&self, index: &BlockIndex, last: BlockId, candidate_time: u32) -> InvariantResult<u32> {
        let interval = self.interval;
        let last_node = index.node(last)?;

        if (last_node.height + 1) % interval != 0 {
            if !self.allow_min_difficulty_blocks {
                return Ok(last_node.bits);
            }
            let limit_bits = self.pow.limit_bits();
            if candidate_time as i64 > last_node.block_time() + self.pow.target_spacing * 2 {
                return Ok(limit_bits);
            }
            // The last block not mined under the minimum-difficulty rule
            let mut current = last;
            walk_back_while(index, &mut current, |node| node.height % interval != 0 && node.bits == limit_bits)?;
            return Ok(index.node(current)?.bits);
        }

        let first = expect_ancestor(index, last, last_node.height + 1 - interval)?;
        let bits = self.calculate_next_work_required(last_node, index.node(first)?.block_time());
        trace!("Periodic retarget at height {}: {:#010x}", last_node.height + 1, bits);
        Ok(bits)
    }

    /// Scales the last target by the measured timespan, clamped to a factor of four either way
    pub fn calculate_next_work_required(&self, last: &BlockIndexNode, first_block_time: i64) -> u32 {
        if self.no_retargeting {
            return last.bits;
        }
        let timespan = self.pow.target_timespan;
        let actual_timespan = (last.block_time() - first_block_time).clamp(timespan / 4, timespan * 4);

        let new_target = Uint256::from_compact_target_bits(last.bits).overflowing_mul_u64(actual_timespan as u64).0 / timespan as u64;
        new_target.min(self.pow.limit).compact_target_bits()
    }
}
