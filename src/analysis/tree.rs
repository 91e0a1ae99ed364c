//! 可达树：深度受限、不去重的发射序列枚举。
//!
//! 树的规模为 O(b^max_depth)，b 为分支因子；调用方需选择较小的深度（参考值 10）。
use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::net::{Marking, Net, TransitionId};

pub const DEFAULT_TREE_DEPTH: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    /// `root`, `root.TTckt`, `root.TTckt.StEx`, ...; unique per node.
    pub path: String,
    pub marking: Marking,
    pub label: String,
    /// Name of the transition fired from the parent; `None` for the root.
    pub transition: Option<String>,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct TreeEdge {
    pub transition: TransitionId,
    pub name: String,
}

#[derive(Debug)]
pub struct ReachabilityTree {
    pub graph: Graph<TreeNode, TreeEdge>,
    pub root: NodeIndex,
    pub max_depth: usize,
}

struct Pending {
    parent: NodeIndex,
    transition: TransitionId,
    marking: Marking,
    depth: usize,
}

impl ReachabilityTree {
    /// Expands every enabled transition, in declaration order, from each node
    /// shallower than `max_depth`. Node indices follow pre-order.
    pub fn build(net: &Net, initial: &Marking, max_depth: usize) -> Self {
        let mut graph = Graph::new();
        let root = graph.add_node(TreeNode {
            path: "root".to_owned(),
            marking: initial.clone(),
            label: net.label(initial),
            transition: None,
            depth: 0,
        });

        let mut stack = Vec::new();
        push_children(net, &mut stack, root, initial, 0, max_depth);

        while let Some(Pending {
            parent,
            transition,
            marking,
            depth,
        }) = stack.pop()
        {
            let name = net.transitions()[transition].name.clone();
            let path = format!("{}.{}", graph[parent].path, name);
            let node = graph.add_node(TreeNode {
                path,
                label: net.label(&marking),
                marking: marking.clone(),
                transition: Some(name.clone()),
                depth,
            });
            graph.add_edge(parent, node, TreeEdge { transition, name });
            push_children(net, &mut stack, node, &marking, depth, max_depth);
        }

        log::debug!(
            "reachability tree: {} nodes at max depth {}",
            graph.node_count(),
            max_depth
        );

        Self {
            graph,
            root,
            max_depth,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.graph[index]
    }

    pub fn root(&self) -> &TreeNode {
        &self.graph[self.root]
    }

    /// Children in firing order.
    pub fn children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        children.sort();
        children
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.graph.node_weights()
    }

    pub fn leaves(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .count()
    }

    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        self.nodes().find(|node| node.path == path)
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &|_, edge| format!("label=\"{}\"", escape(&edge.weight().name)),
            &|_, (_, node)| {
                format!(
                    "label=\"{}\", shape=box, style=filled, fillcolor=lightyellow",
                    escape(&node.label)
                )
            },
        );
        format!("{:?}", dot)
    }
}

fn push_children(
    net: &Net,
    stack: &mut Vec<Pending>,
    parent: NodeIndex,
    marking: &Marking,
    depth: usize,
    max_depth: usize,
) {
    if depth >= max_depth {
        return;
    }
    // reversed so the first enabled transition is expanded first
    for transition in net.enabled_transitions(marking).into_iter().rev() {
        match net.fire_transition(marking, transition) {
            Ok(next) => stack.push(Pending {
                parent,
                transition,
                marking: next,
                depth: depth + 1,
            }),
            Err(err) => log::warn!("skipping {:?} in tree expansion: {}", transition, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::reference_net;
    use std::collections::HashSet;

    fn tree(depth: usize) -> ReachabilityTree {
        let net = reference_net().unwrap();
        ReachabilityTree::build(&net, &net.initial_marking(), depth)
    }

    #[test]
    fn depth_zero_is_only_the_root() {
        let tree = tree(0);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root().path, "root");
        assert_eq!(tree.root().label, "W:4, Pr:0, F:1, I:0, D:0");
        assert!(tree.root().transition.is_none());
    }

    #[test]
    fn node_counts_grow_with_depth() {
        let counts: Vec<_> = [1, 2, 3, 4, DEFAULT_TREE_DEPTH]
            .into_iter()
            .map(|depth| tree(depth).node_count())
            .collect();
        assert_eq!(counts, vec![2, 4, 8, 15, 511]);
    }

    #[test]
    fn nodes_are_in_pre_order_with_unique_paths() {
        let tree = tree(3);
        let paths: Vec<_> = tree.nodes().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "root",
                "root.TTckt",
                "root.TTckt.TTckt",
                "root.TTckt.TTckt.TTckt",
                "root.TTckt.TTckt.StEx",
                "root.TTckt.StEx",
                "root.TTckt.StEx.EndEx",
                "root.TTckt.StEx.ReEx",
            ]
        );
        let distinct: HashSet<_> = paths.iter().collect();
        assert_eq!(distinct.len(), paths.len());
    }

    #[test]
    fn markings_repeat_without_deduplication() {
        let tree = tree(3);
        // retry lands back on W:3, Pr:1 which already appears at depth 1
        let retry = tree.find("root.TTckt.StEx.ReEx").unwrap();
        let first = tree.find("root.TTckt").unwrap();
        assert_eq!(retry.marking, first.marking);
        assert_eq!(retry.depth, 3);
        assert_eq!(retry.transition.as_deref(), Some("ReEx"));
    }

    #[test]
    fn depth_cutoff_is_hard() {
        let tree = tree(4);
        assert!(tree.nodes().all(|node| node.depth <= 4));
        for idx in tree.graph.node_indices() {
            if tree.node(idx).depth == 4 {
                assert!(tree.children(idx).is_empty());
            }
        }
    }

    #[test]
    fn children_follow_transition_order() {
        let tree = tree(2);
        let first = tree.children(tree.root)[0];
        let names: Vec<_> = tree
            .children(first)
            .into_iter()
            .map(|idx| tree.node(idx).transition.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["TTckt", "StEx"]);
        assert_eq!(tree.parent(first), Some(tree.root));
        assert_eq!(tree.leaves(), 2);
    }

    #[test]
    fn dot_labels_nodes_and_edges() {
        let dot = tree(1).dot();
        assert!(dot.contains("W:3, Pr:1, F:1, I:0, D:0"));
        assert!(dot.contains("label=\"TTckt\""));
    }
}
