use pink_hashes::{DoubleSha256, Hash, Hasher, ZERO_HASH};
use serde::{Deserialize, Serialize};

/// Size of the canonical header serialization
pub const HEADER_SIZE: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub version: i32,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl Header {
    pub fn new(version: i32, prev_hash: Hash, merkle_root: Hash, time: u32, bits: u32, nonce: u32) -> Self {
        Self { version, prev_hash, merkle_root, time, bits, nonce }
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash == ZERO_HASH
    }

    /// Little-endian fields in declaration order, hashes in digest byte order
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..36].copy_from_slice(&self.prev_hash.as_bytes());
        bytes[36..68].copy_from_slice(&self.merkle_root.as_bytes());
        bytes[68..72].copy_from_slice(&self.time.to_le_bytes());
        bytes[72..76].copy_from_slice(&self.bits.to_le_bytes());
        bytes[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let word = |offset: usize| [bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]];
        Self {
            version: i32::from_le_bytes(word(0)),
            prev_hash: Hash::from_slice(&bytes[4..36]),
            merkle_root: Hash::from_slice(&bytes[36..68]),
            time: u32::from_le_bytes(word(68)),
            bits: u32::from_le_bytes(word(72)),
            nonce: u32::from_le_bytes(word(76)),
        }
    }
}

/// The consensus hash primitive of a deployment. Block identity and the hash compared
/// against the proof-of-work target may differ (e.g. a memory-hard function for the latter).
pub trait HeaderHasher: Send + Sync {
    fn block_hash(&self, header: &Header) -> Hash;

    fn proof_target_hash(&self, header: &Header) -> Hash {
        self.block_hash(header)
    }
}

/// Double SHA-256 over the 80-byte serialization for both identity and proof
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleSha256Hasher;

impl HeaderHasher for DoubleSha256Hasher {
    fn block_hash(&self, header: &Header) -> Hash {
        DoubleSha256::hash(header.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// Parses the conventional byte-reversed display form of a hash
    fn from_display_hex(s: &str) -> Hash {
        let mut bytes = Hash::from_str(s).unwrap().as_bytes();
        bytes.reverse();
        Hash::from_bytes(bytes)
    }

    #[test]
    fn test_double_sha256_genesis_vector() {
        // The Bitcoin genesis header, a widely published double-SHA256 vector
        let header = Header::new(
            1,
            ZERO_HASH,
            from_display_hex("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"),
            1231006505,
            0x1d00ffff,
            2083236893,
        );
        assert!(header.is_genesis());
        let hash = DoubleSha256Hasher.block_hash(&header);
        assert_eq!(hash, from_display_hex("000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"));
        assert_eq!(DoubleSha256Hasher.proof_target_hash(&header), hash);
    }

    #[test]
    fn test_serialization_layout() {
        let header = Header::new(-2, Hash::from(1u64), Hash::from(2u64), 0x01020304, 0x1e0fffff, 42);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[36], 2);
        assert_eq!(&bytes[68..72], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[72..76], &[0xff, 0xff, 0x0f, 0x1e]);
        assert_eq!(Header::from_bytes(&bytes), header);
        assert!(!header.is_genesis());
    }
}
