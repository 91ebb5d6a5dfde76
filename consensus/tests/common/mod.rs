use pink_consensus::{manager::ChainManager, model::index::BlockId};
use pink_consensus_core::header::HeaderHasher;

/// Checks that the active chain is a single parent-linked path from genesis to the tip and
/// that no known block carries more trust than the tip
pub fn assert_chain_consistent<H: HeaderHasher>(manager: &ChainManager<H>) {
    let (index, chain) = (manager.index(), manager.chain());
    let mut previous: Option<BlockId> = None;
    for (height, id) in chain.iter().enumerate() {
        let node = index.node(id).unwrap();
        assert_eq!(node.height, height as u64);
        assert_eq!(node.parent, previous);
        assert!(chain.contains(index, id));
        previous = Some(id);
    }
    let tip_trust = manager.tip_trust().unwrap();
    assert!(index.iter().all(|(_, node)| node.chain_trust <= tip_trust));
}
