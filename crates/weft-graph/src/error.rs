//! Error types for the document-graph model.

use crate::node::NodeId;

/// Errors that can occur during graph construction or traversal.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A referenced node was not found in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A token interval reaches outside the bounds of its primary text.
    #[error("interval [{start}, {end}) out of bounds for text {text} of length {len}")]
    IntervalOutOfBounds {
        /// The primary-text node.
        text: NodeId,
        /// Interval start (inclusive, char offset).
        start: usize,
        /// Interval end (exclusive, char offset).
        end: usize,
        /// Character length of the text.
        len: usize,
    },

    /// A node was used in a role its kind does not support, e.g. spanning
    /// a non-token or anchoring a token to a non-text node.
    #[error("node {node} has the wrong kind for this operation: {expected} expected")]
    WrongNodeKind {
        /// The offending node.
        node: NodeId,
        /// Description of the expected kind.
        expected: &'static str,
    },

    /// A span or structure was created over an empty child set.
    #[error("cannot create a {kind} over an empty child set")]
    EmptyChildSet {
        /// "span" or "structure".
        kind: &'static str,
    },

    /// A cycle was detected while walking hierarchical relations, which
    /// violates the span/dominance DAG invariant.
    #[error("cycle detected in hierarchical relations involving node {0}")]
    CycleDetected(NodeId),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
