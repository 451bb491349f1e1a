//! Orchestration of a document-group merge.
//!
//! [`MergeOrchestrator`] chooses the base document, then folds every other
//! document of the group into it: normalize its texts, cross-align them
//! against the base texts (n:m), merge tokens per aligned pair, run one
//! bottom-up graph-merge traversal, merge pointing relations, and discard
//! the document's transient state. The group merge either fully succeeds or
//! aborts with the first fatal error; there is no partial result.

use std::collections::HashSet;

use tracing::{info, warn};

use weft_align::align_texts;
use weft_graph::{traverse_bottom_up, DocumentGraph, NodeId};

use crate::config::MergeConfig;
use crate::equivalence::{EquivalenceIndex, TextLink};
use crate::error::{MergeError, MergeResult};
use crate::traversal::{merge_pointing_relations, MergeHandler};

/// The outcome of merging a document group.
#[derive(Debug)]
pub struct MergedGroup {
    /// The base document, now carrying the union of the group's content.
    pub base: DocumentGraph,
    /// Names of the documents folded into the base, in merge order. The
    /// documents themselves are consumed by the merge.
    pub absorbed: Vec<String>,
    /// `(document name, text name)` pairs for other-document texts that
    /// aligned with no base text. Diagnostic, not an error.
    pub unmatched_texts: Vec<(String, String)>,
}

/// Drives the merge of whole document groups.
#[derive(Clone, Debug, Default)]
pub struct MergeOrchestrator {
    config: MergeConfig,
}

impl MergeOrchestrator {
    /// An orchestrator with the given configuration.
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Pick the base document: the first one when `first_as_base` is set,
    /// otherwise the document with the greatest node + relation count,
    /// ties broken by position.
    fn choose_base(&self, docs: &[DocumentGraph]) -> usize {
        if self.config.first_as_base {
            return 0;
        }
        let mut best = 0;
        let mut best_weight = 0;
        for (i, doc) in docs.iter().enumerate() {
            let weight = doc.node_count() + doc.relation_count();
            if weight > best_weight {
                best = i;
                best_weight = weight;
            }
        }
        best
    }

    /// Merge a document group into its base document.
    ///
    /// A group of one document is returned unchanged; an empty group is an
    /// error. On any fatal error the whole group merge is aborted.
    pub fn merge_group(&self, mut docs: Vec<DocumentGraph>) -> MergeResult<MergedGroup> {
        if docs.is_empty() {
            return Err(MergeError::EmptyGroup);
        }
        let base_idx = self.choose_base(&docs);
        let mut base = docs.remove(base_idx);
        let mut absorbed = Vec::new();
        let mut unmatched_texts = Vec::new();

        if docs.is_empty() {
            return Ok(MergedGroup {
                base,
                absorbed,
                unmatched_texts,
            });
        }
        info!(base = base.name(), others = docs.len(), "merging document group");

        let omit = self.config.omit();
        let table = &self.config.escape_table;

        let mut index = EquivalenceIndex::new();
        let base_text_ids: Vec<NodeId> = base.texts().map(|n| n.id).collect();
        for &text in &base_text_ids {
            index.register_base_text(&base, text, table)?;
        }

        for other in docs {
            info!(doc = other.name(), "merging document");
            let other_text_ids: Vec<NodeId> = other.texts().map(|n| n.id).collect();
            for &text in &other_text_ids {
                index.register_other_text(&other, text, table)?;
            }

            // n:m alignment of every base text against every other text.
            let mut matched: HashSet<NodeId> = HashSet::new();
            for &base_text in &base_text_ids {
                for &other_text in &other_text_ids {
                    if self.config.only_same_named_texts {
                        let base_name = base.node(base_text).and_then(|n| n.name.as_deref());
                        let other_name = other.node(other_text).and_then(|n| n.name.as_deref());
                        if base_name != other_name {
                            continue;
                        }
                    }
                    let (Some(base_norm), Some(other_norm)) = (
                        index.base_normalized(base_text),
                        index.other_normalized(other_text),
                    ) else {
                        continue;
                    };
                    let Some(alignment) = align_texts(
                        base_norm,
                        other_norm,
                        &omit,
                        self.config.use_indexed_search,
                    ) else {
                        continue;
                    };
                    let link = TextLink {
                        base_text,
                        other_text,
                        offset: alignment.offset,
                        base_is_bigger: alignment.base_is_bigger,
                    };
                    index.add_link(link);
                    index.align_tokens(&mut base, &link)?;
                    matched.insert(other_text);
                }
            }
            for &other_text in &other_text_ids {
                if !matched.contains(&other_text) {
                    let text_name = other
                        .node(other_text)
                        .and_then(|n| n.name.clone())
                        .unwrap_or_default();
                    warn!(
                        doc = other.name(),
                        text = %text_name,
                        "text aligned with no base text"
                    );
                    unmatched_texts.push((other.name().to_string(), text_name));
                }
            }

            // One bottom-up traversal per (base, other) pair, then the
            // pointing pass, then the transient state is discarded.
            let roots = other.hierarchical_roots();
            let mut handler = MergeHandler::new(&mut base, &mut index, self.config.copy_nodes);
            traverse_bottom_up(&other, &roots, &mut handler)?;
            merge_pointing_relations(&mut base, &other, &index)?;
            index.finish_document();
            absorbed.push(other.name().to_string());
        }

        Ok(MergedGroup {
            base,
            absorbed,
            unmatched_texts,
        })
    }
}
