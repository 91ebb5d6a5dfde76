//!
//! Single-writer facade over the block index and the active chain
//!
use crate::{
    model::{
        chain::ActiveChain,
        index::{BlockId, BlockIndex, NewBlock},
    },
    processes::{
        difficulty::DifficultyManager,
        pow::check_proof_of_work,
        trust::{ChainTrustManager, TrustCandidate},
    },
};
use pink_consensus_core::{
    ChainTrust,
    blockkind::BlockKind,
    config::params::Params,
    errors::chain::{ChainError, ChainResult},
    header::{DoubleSha256Hasher, Header, HeaderHasher},
    locator::BlockLocator,
};
use pink_core::{
    log::{debug, info},
    time::Stopwatch,
};
use pink_math::Uint256;

/// What happened to an accepted header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddHeaderOutcome {
    pub id: BlockId,
    /// The header now terminates the active chain
    pub became_tip: bool,
    /// Highest block of the header's branch on the active chain as it was before insertion
    pub fork_point: Option<BlockId>,
}

/// Validates headers, accumulates their trust and keeps the active chain on the branch
/// with the highest accumulated trust.
///
/// Writers take `&mut self`; concurrent readers need an external lock around the manager.
pub struct ChainManager<H: HeaderHasher = DoubleSha256Hasher> {
    params: Params,
    hasher: H,
    index: BlockIndex,
    chain: ActiveChain,
    trust_manager: ChainTrustManager,
    difficulty_manager: DifficultyManager,
}

impl<H: HeaderHasher> ChainManager<H> {
    pub fn new(params: Params, hasher: H) -> Self {
        let trust_manager = ChainTrustManager::new(&params);
        let difficulty_manager = DifficultyManager::new(&params);
        Self { params, hasher, index: BlockIndex::new(), chain: ActiveChain::new(), trust_manager, difficulty_manager }
    }

    /// Inserts the genesis header and makes it the tip. Genesis is trusted as is: its
    /// difficulty and proof of work are not checked.
    pub fn init_genesis(&mut self, header: &Header, kind: BlockKind) -> ChainResult<BlockId> {
        if !self.index.is_empty() {
            return Err(ChainError::GenesisAlreadyInitialized);
        }
        let hash = self.hasher.block_hash(header);
        if !header.prev_hash.is_zero() {
            return Err(ChainError::GenesisWithParent(hash));
        }

        let candidate = TrustCandidate { parent: None, time: header.time, bits: header.bits, kind };
        let chain_trust = self.trust_manager.block_trust(&self.index, &self.chain, candidate, true)?;
        let id = self.index.insert(NewBlock { hash, parent: None, time: header.time, bits: header.bits, kind, chain_trust })?;
        self.chain.set_tip(&self.index, Some(id))?;
        info!("Genesis block {} initialized", hash);
        Ok(id)
    }

    /// Validates `header` against its parent, inserts it and moves the tip if the new
    /// branch carries strictly more trust. `kind` only conveys proof-of-stake-ness; the
    /// flash sub-mode is derived from the header time.
    pub fn add_header(&mut self, header: &Header, kind: BlockKind) -> ChainResult<AddHeaderOutcome> {
        let _sw = Stopwatch::<100>::with_threshold("add_header");

        let tip = self.chain.tip().ok_or(ChainError::MissingGenesis)?;
        let hash = self.hasher.block_hash(header);
        if self.index.contains_hash(&hash) {
            return Err(ChainError::DuplicateBlock(hash));
        }
        let parent = self.index.id_of(&header.prev_hash).ok_or(ChainError::UnknownParent(hash, header.prev_hash))?;
        let kind = self.params.mode_kind(header.time, kind.is_proof_of_stake());

        let expected_bits = self.difficulty_manager.next_target_bits(&self.index, parent, header.time, kind.is_proof_of_stake())?;
        if header.bits != expected_bits {
            return Err(ChainError::UnexpectedDifficulty(hash, header.bits, expected_bits));
        }
        if kind.is_proof_of_work() {
            if !check_proof_of_work(&self.hasher.proof_target_hash(header), header.bits, &self.params) {
                return Err(ChainError::InvalidProofOfWork(hash));
            }
        } else if Uint256::checked_from_compact_target_bits(header.bits).is_none() {
            return Err(ChainError::InvalidTarget(hash, header.bits));
        }

        let candidate = TrustCandidate { parent: Some(parent), time: header.time, bits: header.bits, kind };
        let trust = self.trust_manager.block_trust(&self.index, &self.chain, candidate, true)?;
        let chain_trust = self.index.node(parent)?.chain_trust.overflowing_add(trust).0;

        let id = self.index.insert(NewBlock { hash, parent: Some(parent), time: header.time, bits: header.bits, kind, chain_trust })?;
        let fork_point = self.chain.find_fork(&self.index, Some(id))?;
        let became_tip = chain_trust > self.index.node(tip)?.chain_trust;
        if became_tip {
            if parent == tip {
                debug!("Chain extended to {} at height {} ({})", hash, self.index.node(id)?.height, kind);
            } else {
                let fork_hash = fork_point.map(|fork| self.index.node(fork).map(|node| node.hash)).transpose()?;
                info!("Reorganizing to {} at height {}, fork point {:?}", hash, self.index.node(id)?.height, fork_hash);
            }
            self.chain.set_tip(&self.index, Some(id))?;
        }
        Ok(AddHeaderOutcome { id, became_tip, fork_point })
    }

    /// Compact target a block of `kind` timed at `time` must carry when built on `parent`
    pub fn next_target_bits(&self, parent: BlockId, time: u32, kind: BlockKind) -> ChainResult<u32> {
        Ok(self.difficulty_manager.next_target_bits(&self.index, parent, time, kind.is_proof_of_stake())?)
    }

    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    pub fn chain(&self) -> &ActiveChain {
        &self.chain
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn trust_manager(&self) -> &ChainTrustManager {
        &self.trust_manager
    }

    pub fn tip(&self) -> Option<BlockId> {
        self.chain.tip()
    }

    pub fn tip_trust(&self) -> ChainResult<ChainTrust> {
        let tip = self.chain.tip().ok_or(ChainError::MissingGenesis)?;
        Ok(self.index.node(tip)?.chain_trust)
    }

    /// Locator of the active chain, starting at the tip
    pub fn locator(&self) -> ChainResult<BlockLocator> {
        Ok(self.chain.locator(&self.index, None)?)
    }

    /// Trust difference between `to` and `from` in seconds of work at the tip's difficulty
    pub fn block_proof_equivalent_time(&self, to: BlockId, from: BlockId) -> ChainResult<i64> {
        let tip = self.chain.tip().ok_or(ChainError::MissingGenesis)?;
        Ok(self.trust_manager.block_proof_equivalent_time(&self.index, to, from, tip)?)
    }
}

impl ChainManager {
    /// A manager for the network described by `params`, initialized with its genesis block
    pub fn with_genesis(params: Params) -> ChainResult<Self> {
        let genesis = params.genesis.header();
        let mut manager = Self::new(params, DoubleSha256Hasher);
        manager.init_genesis(&genesis, BlockKind::ProofOfWork)?;
        Ok(manager)
    }
}
