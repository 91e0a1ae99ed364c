//! 可达集：从初始标识出发的广度优先探索，按首次发现顺序去重。
use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::net::{Marking, Net};

#[derive(Debug, Clone, Default)]
pub struct ExploreConfig {
    /// 最多记录的标识数量。None 表示不设上限。
    pub state_limit: Option<usize>,
}

/// Markings reachable from a root marking, in first-discovery order.
///
/// The position of a marking in this set is the index used by
/// [`ReachabilityMatrix`](crate::analysis::ReachabilityMatrix).
#[derive(Debug, Clone)]
pub struct ReachabilitySet {
    markings: IndexSet<Marking>,
    truncated: bool,
}

/// Equal only when the discovery order matches too; `IndexSet` equality
/// alone ignores order.
impl PartialEq for ReachabilitySet {
    fn eq(&self, other: &Self) -> bool {
        self.truncated == other.truncated && self.markings.iter().eq(other.markings.iter())
    }
}

impl Eq for ReachabilitySet {}

impl ReachabilitySet {
    pub fn explore(net: &Net, initial: &Marking) -> Self {
        Self::with_config(net, initial, &ExploreConfig::default())
    }

    /// Breadth-first search over `net` starting at `initial`.
    ///
    /// Successors are enqueued for every enabled transition in declaration
    /// order, without checking whether they were seen; duplicates are
    /// dropped when popped.
    pub fn with_config(net: &Net, initial: &Marking, config: &ExploreConfig) -> Self {
        let mut markings = IndexSet::new();
        let mut queue = VecDeque::from([initial.clone()]);
        let mut truncated = false;
        let mut popped = 0usize;

        while let Some(current) = queue.pop_front() {
            popped += 1;
            if markings.contains(&current) {
                continue;
            }
            if config
                .state_limit
                .is_some_and(|limit| markings.len() >= limit)
            {
                truncated = true;
                break;
            }

            for transition in net.enabled_transitions(&current) {
                match net.fire_transition(&current, transition) {
                    Ok(next) => queue.push_back(next),
                    Err(err) => log::warn!("skipping {:?} during exploration: {}", transition, err),
                }
            }
            markings.insert(current);
        }

        log::debug!(
            "reachability: {} markings, {} dequeued, truncated={}",
            markings.len(),
            popped,
            truncated
        );

        Self {
            markings,
            truncated,
        }
    }

    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    /// True when the state limit stopped exploration early.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn get(&self, index: usize) -> Option<&Marking> {
        self.markings.get_index(index)
    }

    pub fn index_of(&self, marking: &Marking) -> Option<usize> {
        self.markings.get_index_of(marking)
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        self.markings.contains(marking)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marking> {
        self.markings.iter()
    }

    pub fn to_vec(&self) -> Vec<Marking> {
        self.markings.iter().cloned().collect()
    }

    pub fn labels(&self, net: &Net) -> Vec<String> {
        self.markings.iter().map(|m| net.label(m)).collect()
    }
}
