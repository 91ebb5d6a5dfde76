use crate::header::Header;
use pink_hashes::{Hash, ZERO_HASH};
use serde::{Deserialize, Serialize};

/// The genesis header fields of a network. The identity hash is not stored since it
/// depends on the deployment's [`HeaderHasher`](crate::header::HeaderHasher).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisBlock {
    pub version: i32,
    pub merkle_root: Hash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl GenesisBlock {
    pub fn header(&self) -> Header {
        Header::new(self.version, ZERO_HASH, self.merkle_root, self.time, self.bits, self.nonce)
    }
}

/// Merkle root of the single coinbase shared by every network's genesis
const GENESIS_MERKLE_ROOT: Hash = Hash::from_bytes([
    0x91, 0xd8, 0xfa, 0x26, 0x3b, 0x4f, 0x00, 0x0a, 0xe2, 0x81, 0xfc, 0x1c, 0x80, 0x46, 0xb0, 0x6a, 0x5c, 0x30, 0x7a, 0xe2, 0x43, 0x85,
    0xc1, 0xbd, 0xad, 0x0a, 0x33, 0x9c, 0x31, 0x72, 0xf8, 0x96,
]);

pub const GENESIS: GenesisBlock =
    GenesisBlock { version: 1, merkle_root: GENESIS_MERKLE_ROOT, time: 1486329989, bits: 0x1e0fffff, nonce: 6777712 };

pub const TESTNET_GENESIS: GenesisBlock =
    GenesisBlock { version: 1, merkle_root: GENESIS_MERKLE_ROOT, time: 1486329989, bits: 0x1f00ffff, nonce: 23112 };

pub const REGTEST_GENESIS: GenesisBlock = GENESIS;
