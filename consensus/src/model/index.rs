use crate::processes::skiplist::{get_ancestor, skip_height};
use pink_consensus_core::{
    BlockHeight, ChainTrust,
    blockkind::BlockKind,
    errors::{
        chain::{ChainError, ChainResult},
        invariant::{InvariantResult, InvariantViolation},
    },
};
use pink_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display};

/// Dense, stable handle of a node inside a [`BlockIndex`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u32);

impl BlockId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One known block header. Parent and skip links are arena handles; both are fixed at
/// insertion and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndexNode {
    pub hash: Hash,
    pub height: BlockHeight,
    pub parent: Option<BlockId>,
    /// Non-adjacent ancestor at `skip_height(height)`, unset below height 2
    pub skip: Option<BlockId>,
    pub time: u32,
    /// Maximal timestamp over this node and all its ancestors
    pub time_max: u32,
    pub bits: u32,
    pub kind: BlockKind,
    pub chain_trust: ChainTrust,
}

impl BlockIndexNode {
    #[inline]
    pub fn block_time(&self) -> i64 {
        self.time as i64
    }

    #[inline]
    pub fn is_proof_of_stake(&self) -> bool {
        self.kind.is_proof_of_stake()
    }
}

/// Header-level fields of a node about to be inserted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewBlock {
    pub hash: Hash,
    pub parent: Option<BlockId>,
    pub time: u32,
    pub bits: u32,
    pub kind: BlockKind,
    pub chain_trust: ChainTrust,
}

/// Append-only arena of block index nodes, addressable by [`BlockId`] or by hash.
///
/// Writers must be serialized by the owner; nodes are sealed on insertion, so any
/// number of readers may share an immutable borrow.
#[derive(Clone, Debug, Default)]
pub struct BlockIndex {
    nodes: Vec<BlockIndexNode>,
    ids: HashMap<Hash, BlockId>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockIndexNode> {
        self.nodes.get(id.index())
    }

    /// Like [`Self::get`], but treats an unknown id as a corrupted graph
    pub fn node(&self, id: BlockId) -> InvariantResult<&BlockIndexNode> {
        self.get(id).ok_or(InvariantViolation::UnknownBlockId(id.raw()))
    }

    pub fn id_of(&self, hash: &Hash) -> Option<BlockId> {
        self.ids.get(hash).copied()
    }

    pub fn contains_hash(&self, hash: &Hash) -> bool {
        self.ids.contains_key(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockIndexNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (BlockId(i as u32), node))
    }

    /// Inserts and seals a node: derives its height and time ceiling from the parent and
    /// builds its skip link.
    pub fn insert(&mut self, block: NewBlock) -> ChainResult<BlockId> {
        if self.contains_hash(&block.hash) {
            return Err(ChainError::DuplicateBlock(block.hash));
        }
        let (height, time_max, skip) = match block.parent {
            Some(parent) => {
                let parent_node = self.node(parent)?;
                let height = parent_node.height + 1;
                let skip = get_ancestor(self, parent, skip_height(height))?;
                (height, parent_node.time_max.max(block.time), skip)
            }
            None => (0, block.time, None),
        };
        let id = BlockId(self.nodes.len() as u32);
        self.nodes.push(BlockIndexNode {
            hash: block.hash,
            height,
            parent: block.parent,
            skip,
            time: block.time,
            time_max,
            bits: block.bits,
            kind: block.kind,
            chain_trust: block.chain_trust,
        });
        self.ids.insert(block.hash, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::IndexBuilder;

    #[test]
    fn test_insert_derives_height_time_max_and_skip() {
        let mut builder = IndexBuilder::new();
        builder.add_block_with_time(1.into(), 0.into(), 100).add_block_with_time(2.into(), 1.into(), 90);
        for i in 3..=8u64 {
            builder.add_block_with_time(i.into(), (i - 1).into(), 100 + i as u32);
        }
        let index = builder.build();

        let node = |hash: u64| index.node(index.id_of(&hash.into()).unwrap()).unwrap();
        assert_eq!(node(1).height, 0);
        assert_eq!(node(1).skip, None);
        assert_eq!(node(2).height, 1);
        assert_eq!(node(2).time_max, 100);
        assert_eq!(node(3).time_max, 103);
        // height 6 skips to height 4
        assert_eq!(node(7).height, 6);
        assert_eq!(node(7).skip, index.id_of(&5.into()));
        assert_eq!(index.len(), 8);
    }

    #[test]
    fn test_insert_rejects_duplicates_and_unknown_parents() {
        let mut index = IndexBuilder::new().add_block(1.into(), 0.into()).build();
        let genesis = index.id_of(&1.into()).unwrap();
        let block = NewBlock {
            hash: 1.into(),
            parent: Some(genesis),
            time: 0,
            bits: 0x207fffff,
            kind: BlockKind::ProofOfWork,
            chain_trust: ChainTrust::ZERO,
        };
        assert_eq!(index.insert(block), Err(ChainError::DuplicateBlock(1.into())));
        let block = NewBlock { hash: 2.into(), parent: Some(BlockId::new(42)), ..block };
        assert_eq!(index.insert(block), Err(ChainError::Invariant(InvariantViolation::UnknownBlockId(42))));
        assert!(index.get(BlockId::new(1)).is_none());
    }

    #[test]
    fn test_block_id_serde() {
        let id = BlockId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        assert_eq!(serde_json::from_str::<BlockId>("7").unwrap(), id);
        assert_eq!(id.to_string(), "#7");
    }
}
