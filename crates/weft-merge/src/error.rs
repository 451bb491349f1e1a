//! Error types for the merge engine.
//!
//! Fatal variants indicate a broken internal invariant, not bad input:
//! the merge of the whole document group aborts and no partial result is
//! reported. Expected conditions (an unalignable text pair, a pointing
//! relation with an unresolved endpoint, a duplicate pointing relation)
//! are logged and skipped instead of raised.

use weft_align::AlignError;
use weft_graph::{GraphError, NodeId};

/// Errors that can occur during a merge operation.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// An underlying graph operation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An offset-table lookup failed (malformed or out-of-sync table).
    #[error(transparent)]
    Align(#[from] AlignError),

    /// A token's aligned interval denormalizes below zero.
    #[error(
        "aligned interval of token {token} falls before the base text: \
         start {start} minus link offset {offset}"
    )]
    NegativeOffset {
        /// The other-graph token being mapped.
        token: NodeId,
        /// Its normalized start in the other text.
        start: usize,
        /// The text-link offset that could not be subtracted.
        offset: usize,
    },

    /// A child equivalent that the post-order traversal must have produced
    /// was not found in the equivalence map.
    #[error("no equivalent for child {child} while merging parent {parent}")]
    MissingEquivalent {
        /// The unresolved child (other graph).
        child: NodeId,
        /// The span or structure being merged (other graph).
        parent: NodeId,
    },

    /// A token references a primary text that was never registered with the
    /// equivalence index.
    #[error("text {text} of token {token} is not registered for this merge")]
    UnregisteredText {
        /// The referencing token.
        token: NodeId,
        /// The unknown text node.
        text: NodeId,
    },

    /// A token carries no textual relation at all.
    #[error("token {0} has no textual anchor")]
    UnanchoredToken(NodeId),

    /// An empty document group was submitted for merging.
    #[error("cannot merge an empty document group")]
    EmptyGroup,
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
