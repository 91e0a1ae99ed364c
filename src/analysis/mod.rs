//! 状态空间分析：可达集、可达树与可达矩阵。
use thiserror::Error;

use crate::net::FireError;

pub mod matrix;
pub mod reachability;
pub mod tree;

pub use matrix::ReachabilityMatrix;
pub use reachability::{ExploreConfig, ReachabilitySet};
pub use tree::{DEFAULT_TREE_DEPTH, ReachabilityTree, TreeEdge, TreeNode};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The set is not closed under firing, which only happens when exploration
    /// was cut short by a state limit.
    #[error("marking {label} reached from #{from_index} via `{transition}` is not in the reachability set")]
    MissingMarking {
        from_index: usize,
        transition: String,
        label: String,
    },
    #[error(transparent)]
    Fire(#[from] FireError),
}
