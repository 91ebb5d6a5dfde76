use super::index::{BlockId, BlockIndex};
use crate::processes::skiplist::expect_ancestor;
use pink_consensus_core::{
    BlockHeight,
    errors::invariant::{InvariantResult, InvariantViolation},
    locator::BlockLocator,
};

/// Number of locator entries collected one block apart before the step starts doubling
const LOCATOR_DENSE_PREFIX: usize = 10;

/// Height-indexed view of the active (best) chain: entry `h` is the chain's block at
/// height `h`, from genesis up to the tip.
#[derive(Clone, Debug, Default)]
pub struct ActiveChain {
    entries: Vec<BlockId>,
}

impl ActiveChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genesis(&self) -> Option<BlockId> {
        self.entries.first().copied()
    }

    pub fn tip(&self) -> Option<BlockId> {
        self.entries.last().copied()
    }

    /// Height of the tip, `None` for an empty chain
    pub fn height(&self) -> Option<BlockHeight> {
        self.entries.len().checked_sub(1).map(|h| h as BlockHeight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, height: BlockHeight) -> Option<BlockId> {
        usize::try_from(height).ok().and_then(|h| self.entries.get(h)).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = BlockId> + '_ {
        self.entries.iter().copied()
    }

    pub fn contains(&self, index: &BlockIndex, id: BlockId) -> bool {
        index.get(id).is_some_and(|node| self.get(node.height) == Some(id))
    }

    /// The block following `id` on this chain, if `id` is on it and is not the tip
    pub fn next(&self, index: &BlockIndex, id: BlockId) -> Option<BlockId> {
        if !self.contains(index, id) {
            return None;
        }
        index.get(id).and_then(|node| self.get(node.height + 1))
    }

    /// Makes `tip` the chain tip. Only the entries above the fork point with the current
    /// chain are rewritten. `None` clears the chain.
    pub fn set_tip(&mut self, index: &BlockIndex, tip: Option<BlockId>) -> InvariantResult<()> {
        let Some(tip) = tip else {
            self.entries.clear();
            return Ok(());
        };

        let tip_height = index.node(tip)?.height as usize;
        self.entries.truncate(tip_height + 1);

        // Collect the new branch from the tip down to the first block already in place
        let mut branch = Vec::new();
        let mut current = Some(tip);
        while let Some(id) = current {
            let node = index.node(id)?;
            if self.entries.get(node.height as usize) == Some(&id) {
                break;
            }
            if node.parent.is_none() && node.height != 0 {
                return Err(InvariantViolation::MissingParent(node.hash, node.height));
            }
            branch.push(id);
            current = node.parent;
        }

        let fork_height = tip_height + 1 - branch.len();
        self.entries.truncate(fork_height);
        self.entries.extend(branch.into_iter().rev());
        Ok(())
    }

    /// The highest block shared by this chain and the branch ending at `id`
    pub fn find_fork(&self, index: &BlockIndex, id: Option<BlockId>) -> InvariantResult<Option<BlockId>> {
        let (Some(mut current), Some(chain_height)) = (id, self.height()) else {
            return Ok(None);
        };
        if index.node(current)?.height > chain_height {
            current = expect_ancestor(index, current, chain_height)?;
        }
        loop {
            if self.contains(index, current) {
                return Ok(Some(current));
            }
            match index.node(current)?.parent {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Builds a locator starting at `from` (the tip when `None`): the first entries are
    /// consecutive, then the step doubles each time, and genesis always closes the list.
    pub fn locator(&self, index: &BlockIndex, from: Option<BlockId>) -> InvariantResult<BlockLocator> {
        let mut hashes = Vec::with_capacity(32);
        let Some(mut current) = from.or(self.tip()) else {
            return Ok(BlockLocator::default());
        };

        let mut step: BlockHeight = 1;
        loop {
            let node = index.node(current)?;
            hashes.push(node.hash);
            if node.height == 0 {
                break;
            }
            let height = node.height.saturating_sub(step);
            current = if self.contains(index, current) {
                self.get(height).ok_or(InvariantViolation::ChainHeightMismatch(height, node.hash, node.height))?
            } else {
                expect_ancestor(index, current, height)?
            };
            if hashes.len() > LOCATOR_DENSE_PREFIX {
                step = step.saturating_mul(2);
            }
        }
        Ok(BlockLocator::new(hashes))
    }

    /// First block on the chain whose time ceiling (maximal timestamp up to and including
    /// it) is at least `time`
    pub fn find_earliest_at_least(&self, index: &BlockIndex, time: u32) -> InvariantResult<Option<BlockId>> {
        let (mut low, mut high) = (0usize, self.entries.len());
        while low < high {
            let mid = low + (high - low) / 2;
            if index.node(self.entries[mid])?.time_max < time {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        Ok(self.entries.get(low).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::IndexBuilder;
    use itertools::Itertools;

    fn id(index: &BlockIndex, hash: u64) -> BlockId {
        index.id_of(&hash.into()).unwrap()
    }

    /// Main chain 1..=20 and a side branch 101..=110 forking off block 8 (height 7)
    fn forked_index() -> BlockIndex {
        let mut builder = IndexBuilder::linear(20);
        builder.add_block(101.into(), 8.into());
        for i in 102..=110u64 {
            builder.add_block(i.into(), (i - 1).into());
        }
        builder.build()
    }

    #[test]
    fn test_set_tip_projects_path() {
        let index = forked_index();
        let mut chain = ActiveChain::new();
        assert_eq!(chain.height(), None);
        assert_eq!(chain.tip(), None);

        chain.set_tip(&index, Some(id(&index, 20))).unwrap();
        assert_eq!(chain.height(), Some(19));
        assert_eq!(chain.genesis(), Some(id(&index, 1)));
        for h in 1..=20u64 {
            let block = id(&index, h);
            assert!(chain.contains(&index, block));
            assert_eq!(chain.get(h - 1), Some(block));
        }
        assert!(!chain.contains(&index, id(&index, 101)));

        // Reorg onto the side branch
        chain.set_tip(&index, Some(id(&index, 110))).unwrap();
        assert_eq!(chain.len(), 18);
        assert_eq!(chain.tip(), Some(id(&index, 110)));
        assert!(chain.contains(&index, id(&index, 8)));
        assert!(!chain.contains(&index, id(&index, 9)));
        assert!(chain.iter().tuple_windows().all(|(a, b)| index.node(b).unwrap().parent == Some(a)));
        for (h, block) in chain.iter().enumerate() {
            assert_eq!(index.node(block).unwrap().height, h as u64);
        }

        // And back to a shorter prefix of the main chain
        chain.set_tip(&index, Some(id(&index, 12))).unwrap();
        assert_eq!(chain.height(), Some(11));
        assert!(chain.contains(&index, id(&index, 12)));
        assert!(!chain.contains(&index, id(&index, 101)));

        chain.set_tip(&index, None).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_next() {
        let index = forked_index();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 20))).unwrap();
        assert_eq!(chain.next(&index, id(&index, 1)), Some(id(&index, 2)));
        assert_eq!(chain.next(&index, id(&index, 20)), None);
        assert_eq!(chain.next(&index, id(&index, 105)), None);
    }

    #[test]
    fn test_find_fork() {
        let index = forked_index();
        let mut chain = ActiveChain::new();
        assert_eq!(chain.find_fork(&index, Some(id(&index, 5))), Ok(None));

        chain.set_tip(&index, Some(id(&index, 20))).unwrap();
        assert_eq!(chain.find_fork(&index, None), Ok(None));
        assert_eq!(chain.find_fork(&index, Some(id(&index, 15))), Ok(Some(id(&index, 15))));
        assert_eq!(chain.find_fork(&index, Some(id(&index, 110))), Ok(Some(id(&index, 8))));
        assert_eq!(chain.find_fork(&index, Some(id(&index, 101))), Ok(Some(id(&index, 8))));

        // Candidate taller than the chain gets clamped first
        chain.set_tip(&index, Some(id(&index, 10))).unwrap();
        assert_eq!(chain.find_fork(&index, Some(id(&index, 20))), Ok(Some(id(&index, 10))));
        assert_eq!(chain.find_fork(&index, Some(id(&index, 110))), Ok(Some(id(&index, 8))));
    }

    #[test]
    fn test_locator() {
        let index = IndexBuilder::linear(10_000).build();
        let mut chain = ActiveChain::new();
        assert!(chain.locator(&index, None).unwrap().is_empty());

        chain.set_tip(&index, Some(id(&index, 10_000))).unwrap();
        let locator = chain.locator(&index, None).unwrap();
        // 11 dense entries, then 13 exponentially spaced ones and genesis
        assert_eq!(locator.len(), 25);
        assert_eq!(locator.first(), Some(&10_000u64.into()));
        assert_eq!(locator.last(), Some(&1u64.into()));
        // The dense prefix is consecutive
        for (i, hash) in locator.iter().take(11).enumerate() {
            assert_eq!(*hash, (10_000 - i as u64).into());
        }
        let heights: Vec<u64> = locator.iter().map(|hash| index.node(index.id_of(hash).unwrap()).unwrap().height).collect();
        assert!(heights.iter().tuple_windows().all(|(a, b)| a > b));

        // Off-chain start uses the skip list and still ends at genesis
        let index = forked_index();
        let mut chain = ActiveChain::new();
        chain.set_tip(&index, Some(id(&index, 20))).unwrap();
        let locator = chain.locator(&index, Some(id(&index, 110))).unwrap();
        assert_eq!(locator.first(), Some(&110u64.into()));
        assert_eq!(locator.last(), Some(&1u64.into()));
        assert_eq!(locator.len(), 14);
    }

    #[test]
    fn test_find_earliest_at_least() {
        let mut builder = IndexBuilder::new();
        // times: 100, 90, 150, 120, 200 -> ceilings 100, 100, 150, 150, 200
        for (i, time) in [100u32, 90, 150, 120, 200].into_iter().enumerate() {
            let hash = i as u64 + 1;
            builder.add_block_with_time(hash.into(), (hash - 1).into(), time);
        }
        let index = builder.build();
        let mut chain = ActiveChain::new();
        assert_eq!(chain.find_earliest_at_least(&index, 0), Ok(None));
        chain.set_tip(&index, Some(id(&index, 5))).unwrap();

        assert_eq!(chain.find_earliest_at_least(&index, 0), Ok(Some(id(&index, 1))));
        assert_eq!(chain.find_earliest_at_least(&index, 100), Ok(Some(id(&index, 1))));
        assert_eq!(chain.find_earliest_at_least(&index, 101), Ok(Some(id(&index, 3))));
        assert_eq!(chain.find_earliest_at_least(&index, 150), Ok(Some(id(&index, 3))));
        assert_eq!(chain.find_earliest_at_least(&index, 151), Ok(Some(id(&index, 5))));
        assert_eq!(chain.find_earliest_at_least(&index, 201), Ok(None));
    }
}
