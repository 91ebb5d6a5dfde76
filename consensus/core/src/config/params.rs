pub use super::{
    constants::consensus::*,
    genesis::{GENESIS, GenesisBlock, REGTEST_GENESIS, TESTNET_GENESIS},
};
use crate::{
    blockkind::BlockKind,
    errors::config::{ConfigError, ConfigResult},
    networktype::NetworkType,
};
use chrono::{DateTime, Timelike};
use pink_math::Uint256;
use serde::{Deserialize, Serialize};

/// A height-gated consensus rule change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkActivation(u64);

impl ForkActivation {
    const NEVER: u64 = u64::MAX;
    const ALWAYS: u64 = 0;

    pub const fn new(height: u64) -> Self {
        Self(height)
    }

    pub const fn never() -> Self {
        Self(Self::NEVER)
    }

    pub const fn always() -> Self {
        Self(Self::ALWAYS)
    }

    /// Returns the activation height. Activation checks should go through `self.is_active(..)`
    pub fn height(self) -> u64 {
        self.0
    }

    pub fn is_active(self, current_height: u64) -> bool {
        current_height >= self.0
    }
}

/// Retarget settings of one mining mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningModeParams {
    /// Easiest allowed target
    pub limit: Uint256,
    /// Period (seconds) the moving average is tuned to
    pub target_timespan: i64,
    /// Desired time (seconds) between two blocks of this mode
    pub target_spacing: i64,
}

impl MiningModeParams {
    pub fn limit_bits(&self) -> u32 {
        self.limit.compact_target_bits()
    }

    /// Number of blocks per timespan, zero when the spacing is not positive
    pub fn interval(&self) -> i64 {
        self.target_timespan.checked_div(self.target_spacing).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverrideParams {
    pub pow: Option<MiningModeParams>,
    pub pos: Option<MiningModeParams>,
    pub flash_pos: Option<MiningModeParams>,

    /// UTC hours during which stake blocks are flash stake blocks
    pub flash_stake_hours: Option<[u32; 4]>,

    pub legacy_spacing_clamp_activation: Option<ForkActivation>,
    pub same_sub_mode_lookup_activation: Option<ForkActivation>,
    pub difficulty_v2_activation: Option<ForkActivation>,
    pub trust_upgrade_time: Option<u32>,

    pub pow_allow_min_difficulty_blocks: Option<bool>,
    pub pow_no_retargeting: Option<bool>,
}

impl From<Params> for OverrideParams {
    fn from(p: Params) -> Self {
        Self {
            pow: Some(p.pow),
            pos: Some(p.pos),
            flash_pos: Some(p.flash_pos),
            flash_stake_hours: Some(p.flash_stake_hours),
            legacy_spacing_clamp_activation: Some(p.legacy_spacing_clamp_activation),
            same_sub_mode_lookup_activation: Some(p.same_sub_mode_lookup_activation),
            difficulty_v2_activation: Some(p.difficulty_v2_activation),
            trust_upgrade_time: Some(p.trust_upgrade_time),
            pow_allow_min_difficulty_blocks: Some(p.pow_allow_min_difficulty_blocks),
            pow_no_retargeting: Some(p.pow_no_retargeting),
        }
    }
}

/// Consensus parameters. Contains settings and configurations which are consensus-sensitive.
/// Changing one of these on a network node would exclude and prevent it from reaching consensus
/// with the other unmodified nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub net: NetworkType,
    pub genesis: GenesisBlock,

    pub pow: MiningModeParams,
    pub pos: MiningModeParams,
    pub flash_pos: MiningModeParams,

    pub flash_stake_hours: [u32; 4],

    /// Below this height a negative spacing is replaced by the nominal one (V2.1.0.4 fix)
    pub legacy_spacing_clamp_activation: ForkActivation,

    /// From this height same-sub-mode predecessors are matched on the recorded block kind
    /// instead of the time-derived flash state (V2.2.2 fix)
    pub same_sub_mode_lookup_activation: ForkActivation,

    /// Retargeting switches to the second generation once the last block reaches this height
    pub difficulty_v2_activation: ForkActivation,

    /// Blocks timed strictly after this moment are scored with the stake-aware trust model (V2.2.1)
    pub trust_upgrade_time: u32,

    pub pow_allow_min_difficulty_blocks: bool,
    pub pow_no_retargeting: bool,
}

impl Params {
    pub fn mode(&self, kind: BlockKind) -> &MiningModeParams {
        match kind {
            BlockKind::ProofOfWork => &self.pow,
            BlockKind::ProofOfStake => &self.pos,
            BlockKind::FlashProofOfStake => &self.flash_pos,
        }
    }

    /// Whether the UTC hour of `time` is one of the flash stake hours
    pub fn is_flash_stake(&self, time: u32) -> bool {
        DateTime::from_timestamp(time as i64, 0).is_some_and(|utc| self.flash_stake_hours.contains(&utc.hour()))
    }

    /// The mode a new block timed at `time` is retargeted in
    pub fn mode_kind(&self, time: u32, proof_of_stake: bool) -> BlockKind {
        if proof_of_stake { BlockKind::stake(self.is_flash_stake(time)) } else { BlockKind::ProofOfWork }
    }

    /// Block count between legacy periodic retargets
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow.interval()
    }

    pub fn pow_limit_bits(&self) -> u32 {
        self.pow.limit_bits()
    }

    pub fn is_trust_upgrade_active(&self, time: u32) -> bool {
        time > self.trust_upgrade_time
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for kind in [BlockKind::ProofOfWork, BlockKind::ProofOfStake, BlockKind::FlashProofOfStake] {
            let mode = self.mode(kind);
            if mode.target_spacing <= 0 {
                return Err(ConfigError::NonPositiveSpacing(kind));
            }
            if mode.target_timespan < mode.target_spacing {
                return Err(ConfigError::TimespanBelowSpacing(kind, mode.target_timespan, mode.target_spacing));
            }
            if mode.limit.is_zero() {
                return Err(ConfigError::ZeroLimit(kind));
            }
        }
        if let Some(&hour) = self.flash_stake_hours.iter().find(|&&hour| hour >= 24) {
            return Err(ConfigError::InvalidFlashHour(hour));
        }
        Ok(())
    }

    pub fn override_params(self, overrides: OverrideParams) -> Self {
        Self {
            net: self.net,
            genesis: self.genesis,

            pow: overrides.pow.unwrap_or(self.pow),
            pos: overrides.pos.unwrap_or(self.pos),
            flash_pos: overrides.flash_pos.unwrap_or(self.flash_pos),

            flash_stake_hours: overrides.flash_stake_hours.unwrap_or(self.flash_stake_hours),

            legacy_spacing_clamp_activation: overrides
                .legacy_spacing_clamp_activation
                .unwrap_or(self.legacy_spacing_clamp_activation),
            same_sub_mode_lookup_activation: overrides
                .same_sub_mode_lookup_activation
                .unwrap_or(self.same_sub_mode_lookup_activation),
            difficulty_v2_activation: overrides.difficulty_v2_activation.unwrap_or(self.difficulty_v2_activation),
            trust_upgrade_time: overrides.trust_upgrade_time.unwrap_or(self.trust_upgrade_time),

            pow_allow_min_difficulty_blocks: overrides.pow_allow_min_difficulty_blocks.unwrap_or(self.pow_allow_min_difficulty_blocks),
            pow_no_retargeting: overrides.pow_no_retargeting.unwrap_or(self.pow_no_retargeting),
        }
    }
}

impl From<NetworkType> for Params {
    fn from(value: NetworkType) -> Self {
        match value {
            NetworkType::Mainnet => MAINNET_PARAMS,
            NetworkType::Testnet => TESTNET_PARAMS,
            NetworkType::Regtest => REGTEST_PARAMS,
        }
    }
}

const LEGACY_SPACING_CLAMP_HEIGHT: u64 = 315_065;
// Not a published network value: no activation height was ever assigned, this one sits between the two known forks
const SAME_SUB_MODE_LOOKUP_HEIGHT: u64 = 615_000;
const DIFFICULTY_V2_HEIGHT: u64 = 817_990;
const TRUST_UPGRADE_TIME: u32 = 1_540_771_200;

const POS_MODE: MiningModeParams =
    MiningModeParams { limit: STAKE_LIMIT, target_timespan: POS_TARGET_TIMESPAN, target_spacing: POS_TARGET_SPACING };

const FLASH_POS_MODE: MiningModeParams =
    MiningModeParams { limit: STAKE_LIMIT, target_timespan: FLASH_POS_TARGET_TIMESPAN, target_spacing: FLASH_POS_TARGET_SPACING };

pub const MAINNET_PARAMS: Params = Params {
    net: NetworkType::Mainnet,
    genesis: GENESIS,
    pow: MiningModeParams { limit: MAINNET_POW_LIMIT, target_timespan: POW_TARGET_TIMESPAN, target_spacing: POW_TARGET_SPACING },
    pos: POS_MODE,
    flash_pos: FLASH_POS_MODE,
    flash_stake_hours: FLASH_STAKE_HOURS,
    legacy_spacing_clamp_activation: ForkActivation::new(LEGACY_SPACING_CLAMP_HEIGHT),
    same_sub_mode_lookup_activation: ForkActivation::new(SAME_SUB_MODE_LOOKUP_HEIGHT),
    difficulty_v2_activation: ForkActivation::new(DIFFICULTY_V2_HEIGHT),
    trust_upgrade_time: TRUST_UPGRADE_TIME,
    pow_allow_min_difficulty_blocks: false,
    pow_no_retargeting: false,
};

pub const TESTNET_PARAMS: Params = Params {
    net: NetworkType::Testnet,
    genesis: TESTNET_GENESIS,
    pow: MiningModeParams { limit: TESTNET_POW_LIMIT, target_timespan: POW_TARGET_TIMESPAN, target_spacing: POW_TARGET_SPACING },
    pos: POS_MODE,
    flash_pos: FLASH_POS_MODE,
    flash_stake_hours: FLASH_STAKE_HOURS,
    legacy_spacing_clamp_activation: ForkActivation::new(LEGACY_SPACING_CLAMP_HEIGHT),
    same_sub_mode_lookup_activation: ForkActivation::new(SAME_SUB_MODE_LOOKUP_HEIGHT),
    difficulty_v2_activation: ForkActivation::new(DIFFICULTY_V2_HEIGHT),
    trust_upgrade_time: TRUST_UPGRADE_TIME,
    pow_allow_min_difficulty_blocks: true,
    pow_no_retargeting: false,
};

pub const REGTEST_PARAMS: Params = Params {
    net: NetworkType::Regtest,
    genesis: REGTEST_GENESIS,
    pow: MiningModeParams { limit: REGTEST_LIMIT, target_timespan: POW_TARGET_TIMESPAN, target_spacing: POW_TARGET_SPACING },
    pos: MiningModeParams { limit: REGTEST_LIMIT, target_timespan: POS_TARGET_TIMESPAN, target_spacing: POS_TARGET_SPACING },
    flash_pos: MiningModeParams {
        limit: REGTEST_LIMIT,
        target_timespan: FLASH_POS_TARGET_TIMESPAN,
        target_spacing: FLASH_POS_TARGET_SPACING,
    },
    flash_stake_hours: FLASH_STAKE_HOURS,
    legacy_spacing_clamp_activation: ForkActivation::new(LEGACY_SPACING_CLAMP_HEIGHT),
    same_sub_mode_lookup_activation: ForkActivation::new(SAME_SUB_MODE_LOOKUP_HEIGHT),
    difficulty_v2_activation: ForkActivation::new(DIFFICULTY_V2_HEIGHT),
    trust_upgrade_time: TRUST_UPGRADE_TIME,
    pow_allow_min_difficulty_blocks: true,
    pow_no_retargeting: true,
};
