//! Bottom-up (post-order) traversal over the hierarchical part of a graph.
//!
//! The walk starts from a caller-supplied root set and descends along
//! outgoing relations admitted by the handler's edge predicate. Callbacks
//! fire on entering a node and on leaving it; because the order is
//! post-order, a node is left only after all of its admissible descendants
//! have been left. Shared children (a DAG node with several parents) are
//! entered and left exactly once.

use std::collections::HashSet;

use crate::error::GraphError;
use crate::graph::DocumentGraph;
use crate::node::NodeId;
use crate::relation::{Relation, RelationId};

/// Callbacks driving a bottom-up traversal.
pub trait TraversalHandler {
    /// Error type the handler can abort the walk with. Must absorb
    /// [`GraphError`] so the traversal's own failures (cycles) flow through.
    type Error: From<GraphError>;

    /// Edge-admissibility predicate: return `false` to prune the walk at
    /// this relation (the relation and its subtree are not descended into).
    fn check_edge(&self, graph: &DocumentGraph, relation: &Relation) -> bool;

    /// Called when a node is first reached. `via` is the relation the walk
    /// arrived through, `None` for roots.
    fn node_entered(&mut self, graph: &DocumentGraph, node: NodeId, via: Option<RelationId>);

    /// Called when a node is left, after all admissible descendants have
    /// been left. Errors abort the whole traversal.
    fn node_left(
        &mut self,
        graph: &DocumentGraph,
        node: NodeId,
        via: Option<RelationId>,
    ) -> Result<(), Self::Error>;
}

/// Walk the graph bottom-up from `roots`, invoking the handler's callbacks.
///
/// Uses an explicit stack rather than recursion, so arbitrarily deep
/// hierarchies cannot overflow. A visited-relation set ensures each edge is
/// walked at most once and a visited-node set ensures each node is left at
/// most once; nodes currently on the stack are tracked to detect cycles in
/// relations that are supposed to be hierarchical.
pub fn traverse_bottom_up<H: TraversalHandler>(
    graph: &DocumentGraph,
    roots: &[NodeId],
    handler: &mut H,
) -> Result<(), H::Error> {
    let mut visited_nodes: HashSet<NodeId> = HashSet::new();
    let mut visited_relations: HashSet<RelationId> = HashSet::new();
    let mut on_stack: HashSet<NodeId> = HashSet::new();

    for &root in roots {
        if visited_nodes.contains(&root) {
            continue;
        }
        handler.node_entered(graph, root, None);
        on_stack.insert(root);

        // (node, arrival relation, next outgoing-edge index)
        let mut stack: Vec<(NodeId, Option<RelationId>, usize)> = vec![(root, None, 0)];

        while let Some(&(node, via, edge_idx)) = stack.last() {
            let out = graph.out_relations(node);
            if edge_idx >= out.len() {
                // All admissible children handled: leave the node.
                stack.pop();
                on_stack.remove(&node);
                visited_nodes.insert(node);
                handler.node_left(graph, node, via)?;
                continue;
            }

            let top = stack.len() - 1;
            stack[top].2 += 1;

            let rid = out[edge_idx];
            let Some(rel) = graph.relation(rid) else {
                continue;
            };
            if !handler.check_edge(graph, rel) {
                continue;
            }
            if !visited_relations.insert(rid) {
                continue;
            }
            let child = rel.target;
            if on_stack.contains(&child) {
                return Err(GraphError::CycleDetected(child).into());
            }
            if visited_nodes.contains(&child) {
                continue;
            }
            handler.node_entered(graph, child, Some(rid));
            on_stack.insert(child);
            stack.push((child, Some(rid), 0));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphResult;
    use crate::relation::RelationKind;

    /// Records leave order and rejects pointing relations.
    struct Recorder {
        entered: Vec<NodeId>,
        left: Vec<NodeId>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                entered: Vec::new(),
                left: Vec::new(),
            }
        }
    }

    impl TraversalHandler for Recorder {
        type Error = GraphError;

        fn check_edge(&self, _graph: &DocumentGraph, relation: &Relation) -> bool {
            relation.kind.is_hierarchical()
        }

        fn node_entered(&mut self, _graph: &DocumentGraph, node: NodeId, _via: Option<RelationId>) {
            self.entered.push(node);
        }

        fn node_left(
            &mut self,
            _graph: &DocumentGraph,
            node: NodeId,
            _via: Option<RelationId>,
        ) -> GraphResult<()> {
            self.left.push(node);
            Ok(())
        }
    }

    #[test]
    fn post_order_leaves_children_first() {
        let mut g = DocumentGraph::new("doc");
        let text = g.create_text("t", "ab cd");
        let t1 = g.create_token(text, 0, 2).unwrap();
        let t2 = g.create_token(text, 3, 5).unwrap();
        let span = g.create_span(&[t1, t2]).unwrap();

        let mut rec = Recorder::new();
        traverse_bottom_up(&g, &g.hierarchical_roots(), &mut rec).unwrap();

        // The span is the only root; both tokens (and the text below them)
        // must be left before the span itself.
        let pos = |n: NodeId| rec.left.iter().position(|&x| x == n).unwrap();
        assert!(pos(t1) < pos(span));
        assert!(pos(t2) < pos(span));
        assert!(pos(text) < pos(span));
        assert_eq!(*rec.left.last().unwrap(), span);
    }

    #[test]
    fn shared_child_is_left_exactly_once() {
        let mut g = DocumentGraph::new("doc");
        let text = g.create_text("t", "ab cd");
        let t1 = g.create_token(text, 0, 2).unwrap();
        let t2 = g.create_token(text, 3, 5).unwrap();
        let span = g.create_span(&[t1, t2]).unwrap();
        // Two structures both dominating the same span.
        let s1 = g.create_structure(&[span]).unwrap();
        let s2 = g.create_structure(&[span]).unwrap();

        let mut rec = Recorder::new();
        traverse_bottom_up(&g, &g.hierarchical_roots(), &mut rec).unwrap();

        assert_eq!(rec.left.iter().filter(|&&n| n == span).count(), 1);
        assert_eq!(rec.left.iter().filter(|&&n| n == t1).count(), 1);
        assert!(rec.left.contains(&s1));
        assert!(rec.left.contains(&s2));
    }

    #[test]
    fn pointing_relations_are_pruned() {
        let mut g = DocumentGraph::new("doc");
        let text = g.create_text("t", "ab cd");
        let t1 = g.create_token(text, 0, 2).unwrap();
        let t2 = g.create_token(text, 3, 5).unwrap();
        // A pointing cycle between the two tokens must not trip the walk.
        g.create_pointing(t1, t2, None).unwrap();
        g.create_pointing(t2, t1, None).unwrap();

        let mut rec = Recorder::new();
        traverse_bottom_up(&g, &g.hierarchical_roots(), &mut rec).unwrap();
        assert_eq!(rec.left.iter().filter(|&&n| n == t1).count(), 1);
        assert_eq!(rec.left.iter().filter(|&&n| n == t2).count(), 1);
    }

    #[test]
    fn hierarchical_cycle_is_detected() {
        let mut g = DocumentGraph::new("doc");
        let text = g.create_text("t", "ab");
        let t1 = g.create_token(text, 0, 2).unwrap();
        let s1 = g.create_structure(&[t1]).unwrap();
        let s2 = g.create_structure(&[s1]).unwrap();
        // Forge a back edge; the public constructors cannot produce one.
        g.push_relation(s1, s2, RelationKind::Dominance { dom_type: None })
            .unwrap();

        let mut rec = Recorder::new();
        let result = traverse_bottom_up(&g, &[s2], &mut rec);
        assert!(matches!(result, Err(GraphError::CycleDetected(_))));
    }
}
