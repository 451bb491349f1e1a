//! The arena-backed document graph.
//!
//! [`DocumentGraph`] stores nodes, relations, and layers in arenas and
//! maintains forward/backward edge indices for O(1) neighbor queries.
//! Arena ids make iteration order deterministic: lower ids were created
//! earlier, and ties anywhere in the merge engine are broken by lowest id.
//!
//! # Invariants
//!
//! - Every relation endpoint resolves to an existing node.
//! - Token intervals stay within the bounds of their primary text.
//! - Spanning and dominance relations are acyclic (checked by traversal).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::layer::{Layer, LayerId};
use crate::node::{Annotations, Node, NodeId, NodeKind};
use crate::relation::{Relation, RelationId, RelationKind};

/// An annotation graph over one or more primary texts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocumentGraph {
    /// Document name, e.g. `"corpus1/doc3"`.
    name: String,
    /// Node arena; `NodeId` is the index.
    nodes: Vec<Node>,
    /// Relation arena; `RelationId` is the index.
    relations: Vec<Relation>,
    /// Layer arena; `LayerId` is the index.
    layers: Vec<Layer>,
    /// Forward-edge index: node -> outgoing relations, in insertion order.
    out_edges: Vec<Vec<RelationId>>,
    /// Backward-edge index: node -> incoming relations, in insertion order.
    in_edges: Vec<Vec<RelationId>>,
}

impl DocumentGraph {
    /// Create an empty graph with the given document name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The document name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    // ---------------------------------------------------------------
    // Node construction
    // ---------------------------------------------------------------

    fn push_node(&mut self, name: Option<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        debug!(node = %id, kind = kind.label(), "created node");
        self.nodes.push(Node {
            id,
            name,
            kind,
            annos: Annotations::new(),
            meta: Annotations::new(),
        });
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        id
    }

    /// Add a primary text with a name and content.
    pub fn create_text(&mut self, name: impl Into<String>, content: impl Into<String>) -> NodeId {
        self.push_node(
            Some(name.into()),
            NodeKind::Text {
                content: content.into(),
            },
        )
    }

    /// Add a token anchored to `[start, end)` (char offsets) of a primary
    /// text, connected via a textual relation.
    pub fn create_token(&mut self, text: NodeId, start: usize, end: usize) -> GraphResult<NodeId> {
        let len = self.text_len(text)?;
        if start > end || end > len {
            return Err(GraphError::IntervalOutOfBounds {
                text,
                start,
                end,
                len,
            });
        }
        let token = self.push_node(None, NodeKind::Token);
        self.push_relation(token, text, RelationKind::Textual { start, end })?;
        Ok(token)
    }

    /// Add a span over a non-empty set of tokens, connected via spanning
    /// relations in the given order.
    pub fn create_span(&mut self, tokens: &[NodeId]) -> GraphResult<NodeId> {
        if tokens.is_empty() {
            return Err(GraphError::EmptyChildSet { kind: "span" });
        }
        for &token in tokens {
            let node = self.require_node(token)?;
            if !node.is_token() {
                return Err(GraphError::WrongNodeKind {
                    node: token,
                    expected: "token",
                });
            }
        }
        let span = self.push_node(None, NodeKind::Span);
        for &token in tokens {
            self.push_relation(span, token, RelationKind::Spanning)?;
        }
        Ok(span)
    }

    /// Add a structure over a non-empty set of children (tokens, spans, or
    /// structures), connected via dominance relations in the given order.
    pub fn create_structure(&mut self, children: &[NodeId]) -> GraphResult<NodeId> {
        if children.is_empty() {
            return Err(GraphError::EmptyChildSet { kind: "structure" });
        }
        for &child in children {
            let node = self.require_node(child)?;
            if node.is_text() {
                return Err(GraphError::WrongNodeKind {
                    node: child,
                    expected: "token, span, or structure",
                });
            }
        }
        let structure = self.push_node(None, NodeKind::Structure);
        for &child in children {
            self.push_relation(structure, child, RelationKind::Dominance { dom_type: None })?;
        }
        Ok(structure)
    }

    /// Add a labeled pointing relation between two existing nodes.
    pub fn create_pointing(
        &mut self,
        source: NodeId,
        target: NodeId,
        ptr_type: Option<String>,
    ) -> GraphResult<RelationId> {
        self.push_relation(source, target, RelationKind::Pointing { ptr_type })
    }

    pub(crate) fn push_relation(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: RelationKind,
    ) -> GraphResult<RelationId> {
        self.require_node(source)?;
        self.require_node(target)?;
        let id = RelationId(self.relations.len() as u32);
        self.relations.push(Relation {
            id,
            source,
            target,
            kind,
            annos: Annotations::new(),
            meta: Annotations::new(),
        });
        self.out_edges[source.index()].push(id);
        self.in_edges[target.index()].push(id);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Node / relation access
    // ---------------------------------------------------------------

    /// Retrieve a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn require_node(&self, id: NodeId) -> GraphResult<&Node> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Retrieve a relation by id.
    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(id.index())
    }

    /// Mutable access to a relation.
    pub fn relation_mut(&mut self, id: RelationId) -> Option<&mut Relation> {
        self.relations.get_mut(id.index())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All relations in creation order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    /// Outgoing relations of a node, in insertion order.
    pub fn out_relations(&self, node: NodeId) -> &[RelationId] {
        self.out_edges
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Incoming relations of a node, in insertion order.
    pub fn in_relations(&self, node: NodeId) -> &[RelationId] {
        self.in_edges
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ---------------------------------------------------------------
    // Text and token queries
    // ---------------------------------------------------------------

    /// All primary-text nodes.
    pub fn texts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_text())
    }

    /// All token nodes.
    pub fn tokens(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_token())
    }

    /// The content of a primary text.
    pub fn text_content(&self, text: NodeId) -> GraphResult<&str> {
        match &self.require_node(text)?.kind {
            NodeKind::Text { content } => Ok(content),
            _ => Err(GraphError::WrongNodeKind {
                node: text,
                expected: "text",
            }),
        }
    }

    /// Character length of a primary text.
    pub fn text_len(&self, text: NodeId) -> GraphResult<usize> {
        Ok(self.text_content(text)?.chars().count())
    }

    /// The text and original-coordinate interval a token is anchored to.
    pub fn token_interval(&self, token: NodeId) -> Option<(NodeId, usize, usize)> {
        self.out_relations(token).iter().find_map(|&rid| {
            let rel = self.relation(rid)?;
            match rel.kind {
                RelationKind::Textual { start, end } => Some((rel.target, start, end)),
                _ => None,
            }
        })
    }

    /// Tokens of a primary text, ordered by interval start.
    pub fn tokens_of_text(&self, text: NodeId) -> Vec<(NodeId, usize, usize)> {
        let mut tokens: Vec<(NodeId, usize, usize)> = self
            .in_relations(text)
            .iter()
            .filter_map(|&rid| {
                let rel = self.relation(rid)?;
                match rel.kind {
                    RelationKind::Textual { start, end } => Some((rel.source, start, end)),
                    _ => None,
                }
            })
            .collect();
        tokens.sort_by_key(|&(id, start, _)| (start, id));
        tokens
    }

    // ---------------------------------------------------------------
    // Hierarchy queries
    // ---------------------------------------------------------------

    /// Tokens spanned by a span, in spanning-relation insertion order.
    pub fn spanned_tokens(&self, span: NodeId) -> Vec<NodeId> {
        self.out_relations(span)
            .iter()
            .filter_map(|&rid| {
                let rel = self.relation(rid)?;
                matches!(rel.kind, RelationKind::Spanning).then_some(rel.target)
            })
            .collect()
    }

    /// Children dominated by a structure, in dominance-relation insertion order.
    pub fn dominated_children(&self, structure: NodeId) -> Vec<NodeId> {
        self.out_relations(structure)
            .iter()
            .filter_map(|&rid| {
                let rel = self.relation(rid)?;
                matches!(rel.kind, RelationKind::Dominance { .. }).then_some(rel.target)
            })
            .collect()
    }

    /// Hierarchical parents of a node: sources of incoming spanning or
    /// dominance relations.
    pub fn parents_of(&self, node: NodeId) -> Vec<NodeId> {
        self.in_relations(node)
            .iter()
            .filter_map(|&rid| {
                let rel = self.relation(rid)?;
                rel.kind.is_parental().then_some(rel.source)
            })
            .collect()
    }

    /// Returns `true` if any spanning or dominance relation points at this node.
    pub fn has_incoming_parental(&self, node: NodeId) -> bool {
        self.in_relations(node).iter().any(|&rid| {
            self.relation(rid)
                .is_some_and(|rel| rel.kind.is_parental())
        })
    }

    /// Root set of the hierarchical traversal: every non-text node with no
    /// incoming spanning or dominance relation.
    pub fn hierarchical_roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| !n.is_text() && !self.has_incoming_parental(n.id))
            .map(|n| n.id)
            .collect()
    }

    /// All pointing relations in creation order.
    pub fn pointing_relations(&self) -> Vec<RelationId> {
        self.relations
            .iter()
            .filter(|r| matches!(r.kind, RelationKind::Pointing { .. }))
            .map(|r| r.id)
            .collect()
    }

    // ---------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------

    /// Create a layer with the given name. Returns the existing layer if one
    /// with the same name is already present.
    pub fn create_layer(&mut self, name: impl Into<String>) -> LayerId {
        let name = name.into();
        if let Some(id) = self.layer_by_name(&name) {
            return id;
        }
        let id = LayerId(self.layers.len() as u32);
        debug!(layer = %id, name = %name, "created layer");
        self.layers.push(Layer {
            id,
            name,
            nodes: Default::default(),
            relations: Default::default(),
            annos: Annotations::new(),
            meta: Annotations::new(),
        });
        id
    }

    /// Look up a layer by name.
    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().find(|l| l.name == name).map(|l| l.id)
    }

    /// Retrieve a layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.index())
    }

    /// Mutable access to a layer.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id.index())
    }

    /// All layers in creation order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Add a node to a layer's membership.
    pub fn add_node_to_layer(&mut self, layer: LayerId, node: NodeId) {
        if let Some(l) = self.layers.get_mut(layer.index()) {
            l.nodes.insert(node);
        }
    }

    /// Add a relation to a layer's membership.
    pub fn add_relation_to_layer(&mut self, layer: LayerId, relation: RelationId) {
        if let Some(l) = self.layers.get_mut(layer.index()) {
            l.relations.insert(relation);
        }
    }

    /// Layers a node is a member of, in layer-creation order.
    pub fn layers_of_node(&self, node: NodeId) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|l| l.contains_node(node))
            .map(|l| l.id)
            .collect()
    }

    /// Layers a relation is a member of, in layer-creation order.
    pub fn layers_of_relation(&self, relation: RelationId) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|l| l.contains_relation(relation))
            .map(|l| l.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::QName;

    fn sample_graph() -> (DocumentGraph, NodeId, Vec<NodeId>) {
        let mut g = DocumentGraph::new("doc1");
        let text = g.create_text("text1", "a small example");
        let t1 = g.create_token(text, 0, 1).unwrap();
        let t2 = g.create_token(text, 2, 7).unwrap();
        let t3 = g.create_token(text, 8, 15).unwrap();
        (g, text, vec![t1, t2, t3])
    }

    #[test]
    fn token_interval_round_trip() {
        let (g, text, tokens) = sample_graph();
        assert_eq!(g.token_interval(tokens[1]), Some((text, 2, 7)));
        assert_eq!(
            g.tokens_of_text(text)
                .iter()
                .map(|&(id, _, _)| id)
                .collect::<Vec<_>>(),
            tokens
        );
    }

    #[test]
    fn token_out_of_bounds_is_rejected() {
        let mut g = DocumentGraph::new("doc1");
        let text = g.create_text("text1", "abc");
        assert!(matches!(
            g.create_token(text, 1, 4),
            Err(GraphError::IntervalOutOfBounds { .. })
        ));
    }

    #[test]
    fn span_over_non_token_is_rejected() {
        let (mut g, text, _) = sample_graph();
        assert!(matches!(
            g.create_span(&[text]),
            Err(GraphError::WrongNodeKind { .. })
        ));
        assert!(matches!(
            g.create_span(&[]),
            Err(GraphError::EmptyChildSet { .. })
        ));
    }

    #[test]
    fn roots_exclude_dominated_nodes() {
        let (mut g, _, tokens) = sample_graph();
        let span = g.create_span(&tokens[..2]).unwrap();
        let structure = g.create_structure(&[span, tokens[2]]).unwrap();

        let roots = g.hierarchical_roots();
        assert_eq!(roots, vec![structure]);
        assert!(g.has_incoming_parental(span));
        assert!(!g.has_incoming_parental(structure));
    }

    #[test]
    fn pointing_does_not_affect_roots() {
        let (mut g, _, tokens) = sample_graph();
        g.create_pointing(tokens[0], tokens[2], Some("anaphoric".into()))
            .unwrap();
        let roots = g.hierarchical_roots();
        assert_eq!(roots, tokens);
        assert_eq!(g.pointing_relations().len(), 1);
    }

    #[test]
    fn layer_membership() {
        let (mut g, _, tokens) = sample_graph();
        let layer = g.create_layer("morphology");
        assert_eq!(g.create_layer("morphology"), layer);

        g.add_node_to_layer(layer, tokens[0]);
        assert_eq!(g.layers_of_node(tokens[0]), vec![layer]);
        assert!(g.layers_of_node(tokens[1]).is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let (mut g, _, tokens) = sample_graph();
        let span = g.create_span(&tokens).unwrap();
        g.node_mut(span)
            .unwrap()
            .annos
            .set(QName::new("syn", "cat"), "NP");

        let json = serde_json::to_string(&g).unwrap();
        let back: DocumentGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_count(), g.node_count());
        assert_eq!(back.relation_count(), g.relation_count());
        assert_eq!(
            back.node(span).unwrap().annos.get(&QName::new("syn", "cat")),
            Some("NP")
        );
    }
}
