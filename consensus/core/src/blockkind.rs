use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Mining mode of a block, as classified by the transaction layer (a block is
/// proof-of-stake when its second transaction is a coinstake). The flash sub-mode is
/// derived from the block time falling into one of the configured flash hours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    ProofOfWork,
    ProofOfStake,
    FlashProofOfStake,
}

impl BlockKind {
    pub const fn is_proof_of_stake(self) -> bool {
        matches!(self, Self::ProofOfStake | Self::FlashProofOfStake)
    }

    pub const fn is_proof_of_work(self) -> bool {
        !self.is_proof_of_stake()
    }

    pub const fn is_flash_stake(self) -> bool {
        matches!(self, Self::FlashProofOfStake)
    }

    /// True for stake blocks of the requested sub-mode (flash or regular)
    pub const fn is_stake_sub_mode(self, flash: bool) -> bool {
        self.is_proof_of_stake() && self.is_flash_stake() == flash
    }

    /// The stake kind matching a flash/non-flash state
    pub const fn stake(flash: bool) -> Self {
        if flash { Self::FlashProofOfStake } else { Self::ProofOfStake }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BlockKind::ProofOfWork => "PoW",
            BlockKind::ProofOfStake => "PoS",
            BlockKind::FlashProofOfStake => "FlashPoS",
        };
        f.write_str(s)
    }
}
