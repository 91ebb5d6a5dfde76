//!
//! Fluent builders for block indexes and chains used across the crate's tests and benches
//!
use crate::{
    manager::{AddHeaderOutcome, ChainManager},
    model::index::{BlockId, BlockIndex, NewBlock},
    processes::trust::block_proof,
};
use pink_consensus_core::{
    Hash, ZERO_HASH,
    blockkind::BlockKind,
    config::params::Params,
    header::{DoubleSha256Hasher, Header, HeaderHasher},
};

/// Hasher whose proof hash always meets any valid target, so test chains need no mining
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroProofHasher;

impl HeaderHasher for ZeroProofHasher {
    fn block_hash(&self, header: &Header) -> Hash {
        DoubleSha256Hasher.block_hash(header)
    }

    fn proof_target_hash(&self, _header: &Header) -> Hash {
        ZERO_HASH
    }
}

/// A struct with fluent API to streamline block index building. A zero parent hash
/// inserts a root.
#[derive(Default)]
pub struct IndexBuilder {
    index: BlockIndex,
}

impl IndexBuilder {
    pub const BASE_TIME: u32 = 1_600_000_000;
    pub const SPACING: u32 = 120;
    pub const BITS: u32 = 0x207fffff;

    pub fn new() -> Self {
        Self::default()
    }

    /// A single chain with hashes `1..=len`, hash 1 being the root
    pub fn linear(len: u64) -> Self {
        let mut builder = Self::new();
        for hash in 1..=len {
            builder.add_block(hash.into(), (hash - 1).into());
        }
        builder
    }

    pub fn add_block(&mut self, hash: Hash, parent: Hash) -> &mut Self {
        let time = if parent.is_zero() { Self::BASE_TIME } else { self.node_time(parent) + Self::SPACING };
        self.add_block_with(hash, parent, time, Self::BITS, BlockKind::ProofOfWork)
    }

    pub fn add_block_with_time(&mut self, hash: Hash, parent: Hash, time: u32) -> &mut Self {
        self.add_block_with(hash, parent, time, Self::BITS, BlockKind::ProofOfWork)
    }

    pub fn add_block_with(&mut self, hash: Hash, parent: Hash, time: u32, bits: u32, kind: BlockKind) -> &mut Self {
        let (parent, parent_trust) = if parent.is_zero() {
            (None, Default::default())
        } else {
            let id = self.index.id_of(&parent).unwrap();
            (Some(id), self.index.node(id).unwrap().chain_trust)
        };
        let chain_trust = parent_trust.overflowing_add(block_proof(bits)).0;
        self.index.insert(NewBlock { hash, parent, time, bits, kind, chain_trust }).unwrap();
        self
    }

    fn node_time(&self, hash: Hash) -> u32 {
        self.index.node(self.index.id_of(&hash).unwrap()).unwrap().time
    }

    pub fn build(&mut self) -> BlockIndex {
        std::mem::take(&mut self.index)
    }
}

/// Grows chains through a [`ChainManager`], filling in the required difficulty of every
/// header so that only the shape and timing of the chain need to be specified
pub struct ChainBuilder {
    manager: ChainManager<ZeroProofHasher>,
    nonce: u32,
}

impl ChainBuilder {
    pub fn new(params: Params) -> Self {
        let genesis = params.genesis.header();
        let mut manager = ChainManager::new(params, ZeroProofHasher);
        manager.init_genesis(&genesis, BlockKind::ProofOfWork).unwrap();
        Self { manager, nonce: 0 }
    }

    pub fn genesis(&self) -> BlockId {
        self.manager.chain().genesis().unwrap()
    }

    /// A valid header on `parent`, timed `spacing` seconds after it
    pub fn header(&mut self, parent: BlockId, kind: BlockKind, spacing: u32) -> Header {
        let time = self.manager.index().node(parent).unwrap().time + spacing;
        self.header_at(parent, kind, time)
    }

    pub fn header_at(&mut self, parent: BlockId, kind: BlockKind, time: u32) -> Header {
        let prev_hash = self.manager.index().node(parent).unwrap().hash;
        let bits = self.manager.next_target_bits(parent, time, kind).unwrap();
        // Distinct nonces keep sibling headers apart
        self.nonce += 1;
        Header::new(1, prev_hash, ZERO_HASH, time, bits, self.nonce)
    }

    pub fn add_block(&mut self, parent: BlockId, kind: BlockKind, spacing: u32) -> AddHeaderOutcome {
        let header = self.header(parent, kind, spacing);
        self.manager.add_header(&header, kind).unwrap()
    }

    pub fn add_block_at(&mut self, parent: BlockId, kind: BlockKind, time: u32) -> AddHeaderOutcome {
        let header = self.header_at(parent, kind, time);
        self.manager.add_header(&header, kind).unwrap()
    }

    /// Appends `count` blocks of `kind` on top of `parent` and returns the last one
    pub fn extend(&mut self, parent: BlockId, count: usize, kind: BlockKind, spacing: u32) -> BlockId {
        (0..count).fold(parent, |parent, _| self.add_block(parent, kind, spacing).id)
    }

    pub fn manager(&self) -> &ChainManager<ZeroProofHasher> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ChainManager<ZeroProofHasher> {
        &mut self.manager
    }

    pub fn into_manager(self) -> ChainManager<ZeroProofHasher> {
        self.manager
    }
}
