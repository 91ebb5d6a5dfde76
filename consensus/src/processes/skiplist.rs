//!
//! Logarithmic ancestor lookup over the block index via per-node skip links
//!
use crate::model::index::{BlockId, BlockIndex};
use pink_consensus_core::{
    BlockHeight,
    errors::invariant::{InvariantResult, InvariantViolation},
};
use pink_core::log::error;

/// Clears the lowest set bit
#[inline]
pub fn invert_lowest_one(n: BlockHeight) -> BlockHeight {
    n & n.wrapping_sub(1)
}

/// Height the skip link of a node at `height` points to. Strictly lower than `height`
/// for heights of 2 and above; repeated application keeps ancestor walks logarithmic
/// (at most ~110 steps for spans up to 2^18).
#[inline]
pub fn skip_height(height: BlockHeight) -> BlockHeight {
    if height < 2 {
        return 0;
    }
    if height & 1 == 1 { invert_lowest_one(invert_lowest_one(height - 1)) + 1 } else { invert_lowest_one(height) }
}

/// Returns the ancestor of `id` at `height`, or `None` if `height` is above the node.
///
/// Observably equivalent to following parent links `node.height - height` times. A
/// missing parent link under a node of positive height is a fatal graph violation.
pub fn get_ancestor(index: &BlockIndex, id: BlockId, height: BlockHeight) -> InvariantResult<Option<BlockId>> {
    let node = index.node(id)?;
    if height > node.height {
        return Ok(None);
    }

    let mut walk = id;
    let mut height_walk = node.height;
    while height_walk > height {
        let current = index.node(walk)?;
        let height_skip = skip_height(height_walk);
        let height_skip_prev = skip_height(height_walk - 1);
        match current.skip {
            // Only follow the skip link if the parent's skip link is not a better route
            Some(skip)
                if height_skip == height
                    || (height_skip > height && !(height_skip_prev + 2 < height_skip && height_skip_prev >= height)) =>
            {
                walk = skip;
                height_walk = height_skip;
            }
            _ => {
                walk = current.parent.ok_or_else(|| {
                    error!("block {} at height {} lost its parent link", current.hash, current.height);
                    InvariantViolation::MissingParent(current.hash, current.height)
                })?;
                height_walk -= 1;
            }
        }
    }
    Ok(Some(walk))
}

/// Like [`get_ancestor`] for heights known to be at or below the node
pub fn expect_ancestor(index: &BlockIndex, id: BlockId, height: BlockHeight) -> InvariantResult<BlockId> {
    match get_ancestor(index, id, height)? {
        Some(ancestor) => Ok(ancestor),
        None => {
            let node = index.node(id)?;
            Err(InvariantViolation::MissingParent(node.hash, node.height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::IndexBuilder;
    use rand::Rng;
    use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

    #[test]
    fn test_skip_height() {
        assert_eq!(skip_height(0), 0);
        assert_eq!(skip_height(1), 0);
        for height in 2..100_000u64 {
            assert!(skip_height(height) < height, "height {}", height);
        }
        assert_eq!(skip_height(2), 0);
        assert_eq!(skip_height(3), 1);
        assert_eq!(skip_height(12), 8);
        assert_eq!(skip_height(13), 1);
        assert_eq!(skip_height(15), 9);
        assert_eq!(skip_height(1 << 20), 0);
    }

    /// Naive walk used as the reference
    fn parent_walk(index: &BlockIndex, mut id: BlockId, height: BlockHeight) -> BlockId {
        while index.node(id).unwrap().height > height {
            id = index.node(id).unwrap().parent.unwrap();
        }
        id
    }

    #[test]
    fn test_get_ancestor_matches_parent_walk() {
        const N: u64 = 10_000;
        let index = IndexBuilder::linear(N).build();
        let tip = index.id_of(&N.into()).unwrap();
        assert_eq!(index.node(tip).unwrap().height, N - 1);

        let mut rng = ChaCha8Rng::seed_from_u64(22);
        for _ in 0..2_000 {
            let from = BlockId::new(rng.gen_range(0..N as u32));
            let from_height = index.node(from).unwrap().height;
            let height = rng.gen_range(0..=from_height);
            assert_eq!(get_ancestor(&index, from, height).unwrap(), Some(parent_walk(&index, from, height)));
        }
        // Every height from the tip
        for height in 0..N {
            assert_eq!(index.node(get_ancestor(&index, tip, height).unwrap().unwrap()).unwrap().height, height);
        }
        assert_eq!(get_ancestor(&index, tip, N), Ok(None));
        assert_eq!(get_ancestor(&index, tip, N - 1), Ok(Some(tip)));
    }

    #[test]
    fn test_get_ancestor_on_random_tree() {
        // Random forks: each block picks a parent among the last 64 inserted blocks
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut builder = IndexBuilder::new();
        builder.add_block(1.into(), 0.into());
        for i in 2..=3000u64 {
            let parent = i - rng.gen_range(1..=64.min(i - 1));
            builder.add_block(i.into(), parent.into());
        }
        let index = builder.build();
        for (id, node) in index.iter() {
            for height in [0, node.height / 3, node.height / 2, node.height.saturating_sub(1), node.height] {
                assert_eq!(get_ancestor(&index, id, height).unwrap(), Some(parent_walk(&index, id, height)));
            }
            if let Some(skip) = node.skip {
                assert_eq!(index.node(skip).unwrap().height, skip_height(node.height));
            }
        }
    }

    #[test]
    fn test_expect_ancestor() {
        let index = IndexBuilder::linear(10).build();
        let tip = index.id_of(&10.into()).unwrap();
        assert_eq!(expect_ancestor(&index, tip, 0), Ok(index.id_of(&1.into()).unwrap()));
        assert!(matches!(expect_ancestor(&index, tip, 10), Err(InvariantViolation::MissingParent(_, 9))));
        assert_eq!(get_ancestor(&index, BlockId::new(99), 0), Err(InvariantViolation::UnknownBlockId(99)));
    }
}
