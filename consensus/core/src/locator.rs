use pink_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Exponentially spaced ancestor hashes, newest first and ending with genesis. Sent to
/// peers so they can find the most recent block both sides have in common.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocator(Vec<Hash>);

impl BlockLocator {
    pub fn new(hashes: Vec<Hash>) -> Self {
        Self(hashes)
    }

    pub fn hashes(&self) -> &[Hash] {
        &self.0
    }

    pub fn into_hashes(self) -> Vec<Hash> {
        self.0
    }
}

impl Deref for BlockLocator {
    type Target = [Hash];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Hash>> for BlockLocator {
    fn from(hashes: Vec<Hash>) -> Self {
        Self(hashes)
    }
}
