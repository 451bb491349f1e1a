//! Typed relations between graph nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Annotations, NodeId};

/// Identifier of a relation within one [`DocumentGraph`](crate::DocumentGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub(crate) u32);

impl RelationId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The kind of a relation.
///
/// Textual, spanning, and dominance relations are *hierarchical*: they carry
/// the bottom-up merge traversal. Pointing relations are non-hierarchical,
/// may form cycles, and are merged in a separate pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Token → text anchor with a half-open char interval in the original
    /// (unnormalized) coordinate space of the text.
    Textual {
        /// Interval start, inclusive.
        start: usize,
        /// Interval end, exclusive.
        end: usize,
    },
    /// Span → token membership.
    Spanning,
    /// Structure → child (token, span, or structure) edge.
    Dominance {
        /// Optional dominance type, e.g. `"edge"` or `"secedge"`.
        dom_type: Option<String>,
    },
    /// Labeled non-hierarchical edge between any two nodes.
    Pointing {
        /// Optional pointing type, e.g. `"anaphoric"`.
        ptr_type: Option<String>,
    },
}

impl RelationKind {
    /// Returns `true` for textual, spanning, and dominance relations.
    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, RelationKind::Pointing { .. })
    }

    /// Returns `true` for spanning and dominance relations, the ones that
    /// give a node a hierarchical parent.
    pub fn is_parental(&self) -> bool {
        matches!(self, RelationKind::Spanning | RelationKind::Dominance { .. })
    }
}

/// A directed, typed, annotatable edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// This relation's id within its graph.
    pub id: RelationId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// The relation kind, including any kind-specific payload.
    pub kind: RelationKind,
    /// Regular annotations.
    pub annos: Annotations,
    /// Meta annotations.
    pub meta: Annotations,
}
