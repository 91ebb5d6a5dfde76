//! Chain-selection and difficulty core of a hybrid proof-of-work / proof-of-stake block
//! chain: an append-only block index with skip links, the active chain view, per-block
//! trust and the per-mode difficulty retargeting.

pub mod manager;
pub mod model;
pub mod processes;
pub mod test_helpers;
