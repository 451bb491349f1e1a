//! Document-graph model for weft.
//!
//! A [`DocumentGraph`] is an annotation graph layered over one or more
//! immutable primary texts: tokens anchor character intervals of a text,
//! spans group tokens, structures group tokens/spans/structures into a DAG,
//! and pointing relations add arbitrary labeled edges. Layers group nodes
//! and relations under a name, and every node, relation, and layer carries
//! namespaced key-value annotations.
//!
//! # Key Types
//!
//! - [`DocumentGraph`] — the arena-backed graph with edge indices
//! - [`Node`] / [`NodeKind`] — closed tagged union over text/token/span/structure
//! - [`Relation`] / [`RelationKind`] — textual, spanning, dominance, pointing
//! - [`Layer`] — named, annotatable grouping of nodes and relations
//! - [`Annotations`] — namespaced key-value store with union-absorb semantics
//! - [`traverse_bottom_up`] — post-order DAG traversal with callbacks

pub mod error;
pub mod graph;
pub mod layer;
pub mod node;
pub mod relation;
pub mod traverse;

pub use error::{GraphError, GraphResult};
pub use graph::DocumentGraph;
pub use layer::{Layer, LayerId};
pub use node::{Annotations, Node, NodeId, NodeKind, QName};
pub use relation::{Relation, RelationId, RelationKind};
pub use traverse::{traverse_bottom_up, TraversalHandler};
