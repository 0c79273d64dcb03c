//! Span tree reconstruction.
//!
//! Spans arrive as a flat list in arbitrary order. [`SpanTree::build`] links
//! them into a forest stored in an arena: every node lives in one `Vec`, and
//! parent/child relationships are [`NodeId`] indices into it. Nodes are owned
//! by the arena, so a malformed snapshot can never produce shared or
//! recursive ownership.

use spanscope_protocol::{Span, SpanId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Index of a node inside a [`SpanTree`]
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node's span in the input list
    pub fn index(self) -> usize {
        self.0
    }
}

/// A span plus its place in the tree
#[derive(Clone, Debug)]
pub struct SpanNode {
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

impl SpanNode {
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn span_id(&self) -> &SpanId {
        &self.span.span_id
    }

    /// Resolved parent, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in order of first appearance in the input
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Distance from the root (roots are at depth 0)
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Forest of spans for one trace snapshot
#[derive(Clone, Debug, Default)]
pub struct SpanTree {
    nodes: Vec<SpanNode>,
    roots: Vec<NodeId>,
    index: HashMap<SpanId, NodeId>,
}

impl SpanTree {
    /// Build a forest from a flat list of spans.
    ///
    /// A span becomes a root when its parent is absent, does not resolve
    /// within `spans`, is the span itself, or closes a cycle. Roots and
    /// children keep input order.
    pub fn build(spans: &[Span]) -> Self {
        let mut index = HashMap::with_capacity(spans.len());
        for (i, span) in spans.iter().enumerate() {
            match index.entry(span.span_id.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(NodeId(i));
                }
                Entry::Occupied(_) => {
                    tracing::warn!(span_id = %span.span_id, "duplicate span id, keeping first occurrence for parent lookup");
                }
            }
            if !span.has_ordered_timestamps() {
                tracing::warn!(span_id = %span.span_id, "span ends before it starts");
            }
        }

        let mut parents: Vec<Option<NodeId>> = spans
            .iter()
            .enumerate()
            .map(|(i, span)| {
                let parent_id = span.parent_span_id.as_ref()?;
                match index.get(parent_id) {
                    Some(&parent) if parent.0 == i => {
                        tracing::warn!(span_id = %span.span_id, "span names itself as parent, treating as root");
                        None
                    }
                    Some(&parent) => Some(parent),
                    None => {
                        tracing::debug!(span_id = %span.span_id, parent = %parent_id, "parent not in snapshot, promoting to root");
                        None
                    }
                }
            })
            .collect();

        let cut = break_cycles(&mut parents);
        if cut > 0 {
            tracing::warn!(cycles = cut, "parent references formed cycles, cut at earliest span");
        }

        let mut nodes: Vec<SpanNode> = spans
            .iter()
            .zip(&parents)
            .map(|(span, &parent)| SpanNode {
                span: span.clone(),
                parent,
                children: Vec::new(),
                depth: 0,
            })
            .collect();

        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(parent) => nodes[parent.0].children.push(NodeId(i)),
                None => roots.push(NodeId(i)),
            }
        }

        let mut stack: Vec<(NodeId, usize)> = roots.iter().rev().map(|&root| (root, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let node = &mut nodes[id.0];
            node.depth = depth;
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }

        Self {
            nodes,
            roots,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Span ids of the roots, in input order
    pub fn root_ids(&self) -> Vec<SpanId> {
        self.roots
            .iter()
            .map(|&id| self.node(id).span_id().clone())
            .collect()
    }

    pub fn node(&self, id: NodeId) -> &SpanNode {
        &self.nodes[id.0]
    }

    /// Look a span up by id (first occurrence wins on duplicates)
    pub fn get(&self, span_id: &SpanId) -> Option<NodeId> {
        self.index.get(span_id).copied()
    }

    pub fn span(&self, span_id: &SpanId) -> Option<&Span> {
        self.get(span_id).map(|id| self.node(id).span())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent()
    }

    /// Chain of nodes from the root down to `id`, inclusive
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            // Parent links are acyclic after `build`; the bound keeps it that way.
            if path.len() > self.nodes.len() {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Depth-first pre-order walk over the whole forest
    pub fn pre_order(&self) -> PreOrder<'_, fn(&SpanNode) -> bool> {
        fn descend_all(_: &SpanNode) -> bool {
            true
        }
        self.walk(descend_all as fn(&SpanNode) -> bool)
    }

    /// Depth-first pre-order walk that only descends into nodes for which
    /// `descend` returns true. The node itself is always yielded.
    pub fn walk<F>(&self, descend: F) -> PreOrder<'_, F>
    where
        F: Fn(&SpanNode) -> bool,
    {
        PreOrder {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
            visited: vec![false; self.nodes.len()],
            descend,
        }
    }
}

/// Iterator returned by [`SpanTree::walk`] and [`SpanTree::pre_order`]
pub struct PreOrder<'a, F> {
    tree: &'a SpanTree,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
    descend: F,
}

impl<'a, F> Iterator for PreOrder<'a, F>
where
    F: Fn(&SpanNode) -> bool,
{
    type Item = (NodeId, &'a SpanNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if std::mem::replace(&mut self.visited[id.0], true) {
                continue;
            }
            let node = self.tree.node(id);
            if (self.descend)(node) {
                self.stack.extend(node.children.iter().rev().copied());
            }
            return Some((id, node));
        }
        None
    }
}

/// Cut every cycle in the parent links, returning how many were cut.
///
/// Each node has at most one parent, so every cycle is found by following
/// parent links from each unvisited node. A cycle is cut at its member that
/// appears first in the input, which then becomes a root.
fn break_cycles(parents: &mut [Option<NodeId>]) -> usize {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut path = Vec::new();
    let mut cut = 0;

    for start in 0..parents.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        path.clear();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Unvisited => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    current = parents[i].map(NodeId::index);
                }
                Mark::OnPath => {
                    if let Some(pos) = path.iter().position(|&p| p == i) {
                        if let Some(&earliest) = path[pos..].iter().min() {
                            parents[earliest] = None;
                            cut += 1;
                        }
                    }
                    break;
                }
                Mark::Done => break,
            }
        }

        for &i in &path {
            marks[i] = Mark::Done;
        }
    }

    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, parent: Option<&str>) -> Span {
        Span {
            span_id: SpanId::from(id),
            parent_span_id: parent.map(SpanId::from),
            ..Default::default()
        }
    }

    fn ids<'a>(tree: &'a SpanTree, nodes: &[NodeId]) -> Vec<&'a str> {
        nodes.iter().map(|&n| tree.node(n).span_id().as_str()).collect()
    }

    fn pre_order_ids(tree: &SpanTree) -> Vec<&str> {
        tree.pre_order().map(|(_, node)| node.span_id().as_str()).collect()
    }

    #[test]
    fn single_chain() {
        let tree = SpanTree::build(&[
            span("a", None),
            span("b", Some("a")),
            span("c", Some("b")),
        ]);

        assert_eq!(ids(&tree, tree.roots()), ["a"]);
        let a = tree.get(&"a".into()).unwrap();
        let b = tree.get(&"b".into()).unwrap();
        let c = tree.get(&"c".into()).unwrap();
        assert_eq!(tree.children(a), [b]);
        assert_eq!(tree.children(b), [c]);
        assert_eq!(tree.node(c).depth(), 2);
        assert_eq!(ids(&tree, &tree.ancestry(c)), ["a", "b", "c"]);
    }

    #[test]
    fn parent_listed_after_child() {
        let tree = SpanTree::build(&[span("child", Some("root")), span("root", None)]);
        assert_eq!(ids(&tree, tree.roots()), ["root"]);
        assert_eq!(pre_order_ids(&tree), ["root", "child"]);
    }

    #[test]
    fn orphan_is_promoted_to_root() {
        let tree = SpanTree::build(&[span("x", Some("y"))]);
        assert_eq!(tree.root_ids(), [SpanId::from("x")]);
    }

    #[test]
    fn self_reference_becomes_root() {
        let tree = SpanTree::build(&[span("a", None), span("s", Some("s"))]);
        assert_eq!(ids(&tree, tree.roots()), ["a", "s"]);
        assert_eq!(pre_order_ids(&tree), ["a", "s"]);
    }

    #[test]
    fn cycle_is_cut_at_earliest_span() {
        let tree = SpanTree::build(&[
            span("p", Some("q")),
            span("q", Some("r")),
            span("r", Some("p")),
            span("tail", Some("q")),
        ]);

        assert_eq!(ids(&tree, tree.roots()), ["p"]);
        assert_eq!(pre_order_ids(&tree), ["p", "r", "q", "tail"]);
        let tail = tree.get(&"tail".into()).unwrap();
        assert_eq!(ids(&tree, &tree.ancestry(tail)), ["p", "r", "q", "tail"]);
    }

    #[test]
    fn two_cycle_keeps_both_spans() {
        let tree = SpanTree::build(&[span("a", Some("b")), span("b", Some("a"))]);
        assert_eq!(ids(&tree, tree.roots()), ["a"]);
        assert_eq!(pre_order_ids(&tree), ["a", "b"]);
    }

    #[test]
    fn children_keep_input_order() {
        let tree = SpanTree::build(&[
            span("root", None),
            span("late", Some("root")),
            span("early", Some("root")),
            span("middle", Some("root")),
        ]);
        let root = tree.roots()[0];
        assert_eq!(ids(&tree, tree.children(root)), ["late", "early", "middle"]);
    }

    #[test]
    fn multiple_roots_keep_input_order() {
        let tree = SpanTree::build(&[
            span("r2", None),
            span("c", Some("r1")),
            span("r1", None),
            span("o", Some("gone")),
        ]);
        assert_eq!(ids(&tree, tree.roots()), ["r2", "r1", "o"]);
    }

    #[test]
    fn empty_input() {
        let tree = SpanTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
        assert_eq!(tree.pre_order().count(), 0);
    }

    #[test]
    fn duplicate_ids_still_visited_once_each() {
        let tree = SpanTree::build(&[
            span("a", None),
            span("a", None),
            span("b", Some("a")),
        ]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.pre_order().count(), 3);
        assert_eq!(tree.get(&"a".into()).map(NodeId::index), Some(0));
        assert_eq!(tree.children(tree.roots()[0]).len(), 1);
    }

    #[test]
    fn walk_skips_undescended_subtrees() {
        let tree = SpanTree::build(&[
            span("a", None),
            span("b", Some("a")),
            span("c", Some("b")),
            span("d", Some("a")),
        ]);
        let visited: Vec<_> = tree
            .walk(|node| node.span_id().as_str() != "b")
            .map(|(_, node)| node.span_id().as_str())
            .collect();
        assert_eq!(visited, ["a", "b", "d"]);
    }

    #[test]
    fn pre_order_visits_every_span_once() {
        // Deterministic pseudo-random parent assignment, including dangling
        // references, self references and cycles.
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for round in 0..50 {
            let n = 1 + round * 3;
            let spans: Vec<Span> = (0..n)
                .map(|i| {
                    let parent = match next() % 4 {
                        0 => None,
                        1 => Some(format!("missing-{i}")),
                        _ => Some(format!("s{}", next() % n)),
                    };
                    Span {
                        span_id: SpanId::new(format!("s{i}")),
                        parent_span_id: parent.map(SpanId::new),
                        ..Default::default()
                    }
                })
                .collect();

            let tree = SpanTree::build(&spans);
            let mut seen: Vec<usize> = tree.pre_order().map(|(id, _)| id.index()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>(), "round {round}");

            for root in tree.root_ids() {
                assert!(spans.iter().any(|s| s.span_id == root));
            }
        }
    }
}
