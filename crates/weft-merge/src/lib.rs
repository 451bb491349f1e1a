//! Merge engine for weft.
//!
//! Folds two or more independently produced document graphs over "the same"
//! primary text into a single graph carrying the union of their annotation
//! layers, even when the graphs tokenize, normalize, or encode the text
//! differently.
//!
//! A merge runs in four strictly sequential steps per document pair:
//!
//! 1. normalize every primary text (`weft-align`),
//! 2. align each base text against each other-document text,
//! 3. build the token-level equivalence map ([`EquivalenceIndex`]),
//! 4. extend the equivalence bottom-up to spans, structures, and finally
//!    pointing relations ([`MergeHandler`]), creating or reusing nodes in
//!    the base graph and migrating annotations and layers.
//!
//! [`MergeOrchestrator`] drives the steps for a whole document group.

pub mod config;
pub mod equivalence;
pub mod error;
pub mod orchestrator;
pub mod traversal;

pub use config::MergeConfig;
pub use equivalence::{EquivalenceIndex, TextLink, TokenSpan};
pub use error::{MergeError, MergeResult};
pub use orchestrator::{MergeOrchestrator, MergedGroup};
pub use traversal::{merge_pointing_relations, MergeHandler};
