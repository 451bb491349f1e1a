//! The token-level equivalence index for one merge operation.
//!
//! [`EquivalenceIndex`] is a transient side-table scoped to a single
//! base document: it holds normalized texts and normalized token intervals
//! for the base and for the other document currently being folded in, the
//! text links produced by alignment, and the other-node → base-node
//! equivalence map. It never owns graph state; [`finish_document`] discards
//! the other document's share once its contribution has been merged, so
//! memory stays bounded over a long sequence of merges.
//!
//! [`finish_document`]: EquivalenceIndex::finish_document

use std::collections::HashMap;

use tracing::debug;

use weft_align::{normalize, EscapeTable, NormalizedText};
use weft_graph::{DocumentGraph, NodeId};

use crate::error::{MergeError, MergeResult};

/// A token's interval in normalized coordinates of its text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSpan {
    /// Start offset in normalized chars.
    pub start: usize,
    /// Length in normalized chars.
    pub len: usize,
}

/// A successfully aligned (base text, other text) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextLink {
    /// The base-document text node.
    pub base_text: NodeId,
    /// The other-document text node.
    pub other_text: NodeId,
    /// Char offset into the bigger normalized text at which the smaller
    /// begins.
    pub offset: usize,
    /// `true` if the base text is the bigger of the two.
    pub base_is_bigger: bool,
}

impl TextLink {
    /// Map a normalized position of the other text into the base text.
    /// `None` if the position falls before the base text's start.
    pub fn other_to_base(&self, pos: usize) -> Option<usize> {
        if self.base_is_bigger {
            Some(pos + self.offset)
        } else {
            pos.checked_sub(self.offset)
        }
    }
}

/// Per-text normalization state and token lookup tables.
#[derive(Debug)]
struct TextState {
    normalized: NormalizedText,
    /// Tokens in textual order with their normalized intervals.
    tokens: Vec<(NodeId, TokenSpan)>,
    /// Exact-interval lookup: (start, len) -> token.
    by_interval: HashMap<(usize, usize), NodeId>,
}

impl TextState {
    fn build(graph: &DocumentGraph, text: NodeId, table: &EscapeTable) -> MergeResult<Self> {
        let normalized = normalize(graph.text_content(text)?, table);
        let mut tokens = Vec::new();
        let mut by_interval = HashMap::new();
        for (token, start, end) in graph.tokens_of_text(text) {
            let norm_start = normalized.to_normalized(start)?;
            let norm_end = normalized.to_normalized(end)?;
            let span = TokenSpan {
                start: norm_start,
                len: norm_end - norm_start,
            };
            tokens.push((token, span));
            by_interval.insert((span.start, span.len), token);
        }
        Ok(Self {
            normalized,
            tokens,
            by_interval,
        })
    }
}

/// The transient equivalence state of one merge operation.
#[derive(Debug, Default)]
pub struct EquivalenceIndex {
    /// Base-document texts; retained across all other documents of a group.
    base_texts: HashMap<NodeId, TextState>,
    /// Other-document texts; discarded by [`finish_document`].
    other_texts: HashMap<NodeId, TextState>,
    /// Other token -> (its text, its normalized interval).
    other_token_index: HashMap<NodeId, (NodeId, TokenSpan)>,
    /// Aligned text pairs for the current other document.
    links: Vec<TextLink>,
    /// Other node -> base node. Partial; at most one partner per source.
    equivalents: HashMap<NodeId, NodeId>,
}

impl EquivalenceIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Normalize a base text and index its tokens by normalized interval.
    pub fn register_base_text(
        &mut self,
        base: &DocumentGraph,
        text: NodeId,
        table: &EscapeTable,
    ) -> MergeResult<()> {
        let state = TextState::build(base, text, table)?;
        self.base_texts.insert(text, state);
        Ok(())
    }

    /// Normalize an other-document text and index its tokens.
    pub fn register_other_text(
        &mut self,
        other: &DocumentGraph,
        text: NodeId,
        table: &EscapeTable,
    ) -> MergeResult<()> {
        let state = TextState::build(other, text, table)?;
        for &(token, span) in &state.tokens {
            self.other_token_index.insert(token, (text, span));
        }
        self.other_texts.insert(text, state);
        Ok(())
    }

    /// The normalized form of a registered base text.
    pub fn base_normalized(&self, text: NodeId) -> Option<&NormalizedText> {
        self.base_texts.get(&text).map(|s| &s.normalized)
    }

    /// The normalized form of a registered other-document text.
    pub fn other_normalized(&self, text: NodeId) -> Option<&NormalizedText> {
        self.other_texts.get(&text).map(|s| &s.normalized)
    }

    /// Remember an aligned text pair.
    pub fn add_link(&mut self, link: TextLink) {
        self.links.push(link);
    }

    /// The first link whose other side is the given text.
    pub fn link_for_other_text(&self, text: NodeId) -> Option<&TextLink> {
        self.links.iter().find(|l| l.other_text == text)
    }

    // ---------------------------------------------------------------
    // Equivalence map
    // ---------------------------------------------------------------

    /// The base equivalent of an other-graph node, if resolved.
    pub fn equivalent(&self, other_node: NodeId) -> Option<NodeId> {
        self.equivalents.get(&other_node).copied()
    }

    /// Record an equivalence. A node that already has a partner keeps it.
    pub fn record_equivalence(&mut self, other_node: NodeId, base_node: NodeId) {
        self.equivalents.entry(other_node).or_insert(base_node);
    }

    /// Number of resolved equivalences.
    pub fn equivalence_count(&self) -> usize {
        self.equivalents.len()
    }

    /// The normalized interval of an other-graph token, with its text.
    pub fn other_token_span(&self, token: NodeId) -> Option<(NodeId, TokenSpan)> {
        self.other_token_index.get(&token).copied()
    }

    /// The base token sitting at exactly this normalized interval, if any.
    pub fn base_token_at(&self, text: NodeId, start: usize, len: usize) -> Option<NodeId> {
        self.base_texts
            .get(&text)?
            .by_interval
            .get(&(start, len))
            .copied()
    }

    // ---------------------------------------------------------------
    // Token alignment
    // ---------------------------------------------------------------

    /// Extend a text link to the token level.
    ///
    /// Walks every token of the smaller text and maps its interval into
    /// the bigger text (`start + offset`, length unchanged). An existing
    /// token at exactly that interval becomes an equivalent; a miss creates
    /// a token in the base text when the base is the bigger side, and
    /// leaves the other-side token unmapped when it is not (tokens are only
    /// ever created in the base text). Re-running over an already-complete
    /// map changes nothing.
    pub fn align_tokens(
        &mut self,
        base: &mut DocumentGraph,
        link: &TextLink,
    ) -> MergeResult<usize> {
        let before = self.equivalents.len();
        if link.base_is_bigger {
            // Smaller side: the other text. Map other tokens into the base.
            let other_tokens = self
                .other_texts
                .get(&link.other_text)
                .map(|s| s.tokens.clone())
                .unwrap_or_default();
            for (other_token, span) in other_tokens {
                let start = span.start + link.offset;
                let base_token =
                    match self.base_token_at(link.base_text, start, span.len) {
                        Some(existing) => existing,
                        None => self.create_base_token(
                            base,
                            link.base_text,
                            other_token,
                            start,
                            span.len,
                        )?,
                    };
                self.record_equivalence(other_token, base_token);
            }
        } else {
            // Smaller side: the base text. Map base tokens into the other
            // text; misses stay unmapped since only the base grows tokens.
            let base_tokens = self
                .base_texts
                .get(&link.base_text)
                .map(|s| s.tokens.clone())
                .unwrap_or_default();
            for (base_token, span) in base_tokens {
                let start = span.start + link.offset;
                if let Some(other_token) = self
                    .other_texts
                    .get(&link.other_text)
                    .and_then(|s| s.by_interval.get(&(start, span.len)).copied())
                {
                    self.record_equivalence(other_token, base_token);
                }
            }
        }
        let added = self.equivalents.len() - before;
        debug!(
            base_text = %link.base_text,
            other_text = %link.other_text,
            added,
            "token alignment complete"
        );
        Ok(added)
    }

    /// Instantiate a token in the base text covering a normalized interval,
    /// denormalized back into original coordinates, and index it.
    pub(crate) fn create_base_token(
        &mut self,
        base: &mut DocumentGraph,
        base_text: NodeId,
        source_token: NodeId,
        norm_start: usize,
        norm_len: usize,
    ) -> MergeResult<NodeId> {
        let state =
            self.base_texts
                .get(&base_text)
                .ok_or(MergeError::UnregisteredText {
                    token: source_token,
                    text: base_text,
                })?;
        let orig_start = state.normalized.to_original(norm_start)?;
        // The end is derived from the interval's *last* normalized char, so
        // a deleted character (whitespace) sitting right after the interval
        // does not get swallowed into the token.
        let orig_end = if norm_len == 0 {
            orig_start
        } else {
            state.normalized.to_original(norm_start + norm_len - 1)? + 1
        };
        let token = base.create_token(base_text, orig_start, orig_end)?;
        debug!(token = %token, start = orig_start, end = orig_end, "created base token");
        if let Some(state) = self.base_texts.get_mut(&base_text) {
            state.tokens.push((token, TokenSpan { start: norm_start, len: norm_len }));
            state.by_interval.insert((norm_start, norm_len), token);
        }
        Ok(token)
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Discard all state belonging to the folded-in document: its texts,
    /// token index, links, and the equivalence map. Base-text state is kept
    /// for the next document of the group.
    pub fn finish_document(&mut self) {
        self.other_texts.clear();
        self.other_token_index.clear();
        self.links.clear();
        self.equivalents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_align::{align_texts, OmitChars};

    fn tokenized(name: &str, content: &str, intervals: &[(usize, usize)]) -> (DocumentGraph, NodeId) {
        let mut g = DocumentGraph::new(name);
        let text = g.create_text("text", content);
        for &(s, e) in intervals {
            g.create_token(text, s, e).unwrap();
        }
        (g, text)
    }

    fn link_up(
        index: &mut EquivalenceIndex,
        base_text: NodeId,
        other_text: NodeId,
    ) -> TextLink {
        let alignment = align_texts(
            index.base_normalized(base_text).unwrap(),
            index.other_normalized(other_text).unwrap(),
            &OmitChars::default(),
            true,
        )
        .unwrap();
        let link = TextLink {
            base_text,
            other_text,
            offset: alignment.offset,
            base_is_bigger: alignment.base_is_bigger,
        };
        index.add_link(link);
        link
    }

    #[test]
    fn identical_tokenization_maps_without_creation() {
        let (mut base, base_text) = tokenized("base", "a small example", &[(0, 1), (2, 7), (8, 15)]);
        let (other, other_text) = tokenized("other", "a small example", &[(0, 1), (2, 7), (8, 15)]);

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();

        let link = link_up(&mut index, base_text, other_text);
        let nodes_before = base.node_count();
        index.align_tokens(&mut base, &link).unwrap();

        assert_eq!(index.equivalence_count(), 3);
        assert_eq!(base.node_count(), nodes_before);
        for (other_token, _, _) in other.tokens_of_text(other_text) {
            assert!(index.equivalent(other_token).is_some());
        }
    }

    #[test]
    fn align_tokens_is_idempotent() {
        let (mut base, base_text) = tokenized("base", "one two", &[(0, 3), (4, 7)]);
        let (other, other_text) = tokenized("other", "one two", &[(0, 3), (4, 7)]);

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();

        let link = link_up(&mut index, base_text, other_text);
        index.align_tokens(&mut base, &link).unwrap();
        let size = index.equivalence_count();
        let added = index.align_tokens(&mut base, &link).unwrap();
        assert_eq!(added, 0);
        assert_eq!(index.equivalence_count(), size);
    }

    #[test]
    fn missing_base_token_is_created_in_original_coordinates() {
        // Base has no token over "wäre"; the other document does. The
        // created base token must cover the original (unnormalized) chars.
        let (mut base, base_text) = tokenized("base", "Das wäre gut", &[(0, 3)]);
        let (other, other_text) = tokenized("other", "Das wäre gut", &[(0, 3), (4, 8)]);

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();

        let link = link_up(&mut index, base_text, other_text);
        index.align_tokens(&mut base, &link).unwrap();

        assert_eq!(index.equivalence_count(), 2);
        let tokens = base.tokens_of_text(base_text);
        assert_eq!(tokens.len(), 2);
        // "wäre" sits at original chars [4, 8).
        assert_eq!(tokens[1].1, 4);
        assert_eq!(tokens[1].2, 8);
    }

    #[test]
    fn different_tokenization_only_exact_intervals_match() {
        // Other splits "ab cd" as one big token; base has two. No exact
        // interval coincides, so the other token maps onto a newly created
        // base token spanning both words.
        let (mut base, base_text) = tokenized("base", "ab cd", &[(0, 2), (3, 5)]);
        let (other, other_text) = tokenized("other", "ab cd", &[(0, 5)]);

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();

        let link = link_up(&mut index, base_text, other_text);
        index.align_tokens(&mut base, &link).unwrap();

        // One equivalence for the one other token; base grew a third token.
        assert_eq!(index.equivalence_count(), 1);
        assert_eq!(base.tokens_of_text(base_text).len(), 3);
    }

    #[test]
    fn bigger_other_text_never_grows() {
        let (mut base, base_text) = tokenized("base", "small example", &[(0, 5), (6, 13)]);
        let (mut other, other_text) =
            tokenized("other", "This is no small example", &[(0, 4), (5, 7)]);
        let extra = other.create_token(other_text, 11, 16).unwrap();
        let _ = other.create_token(other_text, 17, 24).unwrap();

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();

        let link = link_up(&mut index, base_text, other_text);
        assert!(!link.base_is_bigger);

        let other_count = other.node_count();
        index.align_tokens(&mut base, &link).unwrap();

        // "small" and "example" match; "This" and "is" stay unmapped and
        // nothing is ever created in the other document.
        assert_eq!(index.equivalence_count(), 2);
        assert_eq!(other.node_count(), other_count);
        assert!(index.equivalent(extra).is_some());
    }

    #[test]
    fn finish_document_clears_transient_state() {
        let (mut base, base_text) = tokenized("base", "one two", &[(0, 3), (4, 7)]);
        let (other, other_text) = tokenized("other", "one two", &[(0, 3), (4, 7)]);

        let table = EscapeTable::default();
        let mut index = EquivalenceIndex::new();
        index.register_base_text(&base, base_text, &table).unwrap();
        index.register_other_text(&other, other_text, &table).unwrap();
        let link = link_up(&mut index, base_text, other_text);
        index.align_tokens(&mut base, &link).unwrap();

        index.finish_document();
        assert_eq!(index.equivalence_count(), 0);
        assert!(index.other_normalized(other_text).is_none());
        assert!(index.link_for_other_text(other_text).is_none());
        // Base state survives for the next document of the group.
        assert!(index.base_normalized(base_text).is_some());
    }
}
