use crate::Hash;
use sha2::{Digest, Sha256};

/// Incremental hasher producing a 256-bit [`Hash`]
pub trait Hasher: Default {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;

    fn finalize(self) -> Hash;

    #[inline]
    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// `SHA256(SHA256(data))`, the classic Bitcoin-family block identity hash
#[derive(Clone, Default)]
pub struct DoubleSha256(Sha256);

impl Hasher for DoubleSha256 {
    #[inline]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    #[inline]
    fn finalize(self) -> Hash {
        let first = self.0.finalize();
        Hash::from_bytes(Sha256::digest(first).into())
    }
}
