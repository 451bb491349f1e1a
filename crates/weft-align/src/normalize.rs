//! Escape-table text normalization with bidirectional offset tables.
//!
//! Normalization rewrites a primary text character by character through an
//! [`EscapeTable`]: unmapped characters pass through, mapped characters are
//! replaced by their (possibly empty, possibly multi-character) replacement.
//! Alongside the normalized text, two offset tables are produced so that
//! token intervals can be mapped from original to normalized coordinates
//! and back. Both tables carry one sentinel entry past the end, so an
//! interval ending at the extreme right of the text can be mapped too.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AlignError, AlignResult};

/// Mapping from original characters to replacement strings.
///
/// The default table drops whitespace and rewrites German umlauts and ß to
/// their ASCII digraphs, which is what makes two differently tokenized and
/// differently encoded renditions of the same text comparable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscapeTable {
    entries: BTreeMap<char, String>,
}

impl EscapeTable {
    /// An empty table: normalization becomes the identity.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace a mapping.
    pub fn insert(&mut self, from: char, to: impl Into<String>) {
        self.entries.insert(from, to.into());
    }

    /// Look up the replacement for a character, if any.
    pub fn lookup(&self, c: char) -> Option<&str> {
        self.entries.get(&c).map(String::as_str)
    }

    /// Returns `true` if the character has a mapping.
    pub fn is_escaped(&self, c: char) -> bool {
        self.entries.contains_key(&c)
    }
}

impl Default for EscapeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for ws in [' ', '\t', '\r', '\n'] {
            table.insert(ws, "");
        }
        table.insert('ä', "ae");
        table.insert('ö', "oe");
        table.insert('ü', "ue");
        table.insert('Ä', "Ae");
        table.insert('Ö', "Oe");
        table.insert('Ü', "Ue");
        table.insert('ß', "ss");
        table
    }
}

impl FromIterator<(char, String)> for EscapeTable {
    fn from_iter<I: IntoIterator<Item = (char, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A normalized text plus its offset tables back to the original.
///
/// All offsets are *char* offsets, not byte offsets: token intervals count
/// characters, and one original character may expand to several normalized
/// ones (ä → ae) or to none at all (whitespace).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedText {
    text: String,
    /// `orig_char_len + 1` entries; `orig_to_norm[i]` is the normalized
    /// position at which original char `i` was written (or would have been).
    orig_to_norm: Vec<usize>,
    /// `norm_char_len + 1` entries; `norm_to_orig[j]` is the original char
    /// index normalized char `j` originates from.
    norm_to_orig: Vec<usize>,
}

impl NormalizedText {
    /// The normalized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character length of the normalized text.
    pub fn norm_len(&self) -> usize {
        self.norm_to_orig.len() - 1
    }

    /// Character length of the original text.
    pub fn orig_len(&self) -> usize {
        self.orig_to_norm.len() - 1
    }

    /// Map an original char offset to its normalized position. Valid inputs
    /// run up to and including the original length (the sentinel).
    pub fn to_normalized(&self, orig: usize) -> AlignResult<usize> {
        self.orig_to_norm
            .get(orig)
            .copied()
            .ok_or(AlignError::OffsetOutOfTable {
                offset: orig,
                size: self.orig_to_norm.len(),
                direction: "original->normalized",
            })
    }

    /// Map a normalized char offset back to the original position. Valid
    /// inputs run up to and including the normalized length (the sentinel).
    pub fn to_original(&self, norm: usize) -> AlignResult<usize> {
        self.norm_to_orig
            .get(norm)
            .copied()
            .ok_or(AlignError::OffsetOutOfTable {
                offset: norm,
                size: self.norm_to_orig.len(),
                direction: "normalized->original",
            })
    }
}

/// Normalize a text through an escape table, producing the normalized text
/// and both offset tables.
///
/// Single scan over the original: an unmapped character is appended and the
/// write cursor advances by one; a mapping to a non-empty replacement emits
/// the same cursor for the single original index and advances by the
/// replacement length; a mapping to the empty string emits the cursor
/// without advancing (the character is deleted). A sentinel entry equal to
/// the final cursor (resp. the original length) closes each table.
pub fn normalize(original: &str, table: &EscapeTable) -> NormalizedText {
    let mut text = String::with_capacity(original.len());
    let mut orig_to_norm = Vec::with_capacity(original.len() + 1);
    let mut norm_to_orig = Vec::with_capacity(original.len() + 1);
    let mut cursor = 0usize;
    let mut orig_len = 0usize;

    for (i, c) in original.chars().enumerate() {
        orig_len += 1;
        orig_to_norm.push(cursor);
        match table.lookup(c) {
            None => {
                text.push(c);
                norm_to_orig.push(i);
                cursor += 1;
            }
            Some(replacement) => {
                for rc in replacement.chars() {
                    text.push(rc);
                    norm_to_orig.push(i);
                    cursor += 1;
                }
            }
        }
    }

    orig_to_norm.push(cursor);
    norm_to_orig.push(orig_len);

    NormalizedText {
        text,
        orig_to_norm,
        norm_to_orig,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn whitespace_is_dropped() {
        let n = normalize(
            "Is this sample more complicated, than it appears to be?",
            &EscapeTable::default(),
        );
        assert_eq!(n.text(), "Isthissamplemorecomplicated,thanitappearstobe?");
    }

    #[test]
    fn umlauts_expand_to_digraphs() {
        let n = normalize("Das wäre überaus schön", &EscapeTable::default());
        assert_eq!(n.text(), "Daswaereueberausschoen");
    }

    #[test]
    fn tables_have_sentinel_entries() {
        let original = "a b";
        let n = normalize(original, &EscapeTable::default());
        assert_eq!(n.orig_len(), 3);
        assert_eq!(n.norm_len(), 2);
        // Sentinels: interval end at the extreme right maps cleanly.
        assert_eq!(n.to_normalized(3).unwrap(), 2);
        assert_eq!(n.to_original(2).unwrap(), 3);
    }

    #[test]
    fn deleted_char_maps_to_following_position() {
        let n = normalize("a b", &EscapeTable::default());
        assert_eq!(n.to_normalized(0).unwrap(), 0);
        // The space produced nothing; it maps to the cursor it was seen at.
        assert_eq!(n.to_normalized(1).unwrap(), 1);
        assert_eq!(n.to_normalized(2).unwrap(), 1);
    }

    #[test]
    fn expanded_char_occupies_a_range() {
        let n = normalize("xäy", &EscapeTable::default());
        assert_eq!(n.text(), "xaey");
        assert_eq!(n.to_normalized(1).unwrap(), 1);
        assert_eq!(n.to_normalized(2).unwrap(), 3);
        // Both normalized chars of the digraph come from original index 1.
        assert_eq!(n.to_original(1).unwrap(), 1);
        assert_eq!(n.to_original(2).unwrap(), 1);
    }

    #[test]
    fn lookup_past_table_is_an_error() {
        let n = normalize("ab", &EscapeTable::empty());
        assert!(n.to_normalized(2).is_ok());
        assert!(matches!(
            n.to_normalized(3),
            Err(AlignError::OffsetOutOfTable { .. })
        ));
        assert!(matches!(
            n.to_original(3),
            Err(AlignError::OffsetOutOfTable { .. })
        ));
    }

    proptest! {
        /// Every normalized char traces back to an original index whose
        /// character, when it has no escape mapping of its own, is the
        /// normalized char itself.
        #[test]
        fn round_trip_of_unescaped_chars(s in "[a-zA-Z äöüß\t?,.]{0,40}") {
            let table = EscapeTable::default();
            let n = normalize(&s, &table);
            let original: Vec<char> = s.chars().collect();
            let normalized: Vec<char> = n.text().chars().collect();

            prop_assert_eq!(n.orig_len(), original.len());
            prop_assert_eq!(n.norm_len(), normalized.len());

            for (j, &nc) in normalized.iter().enumerate() {
                let o = n.to_original(j).unwrap();
                let oc = original[o];
                if !table.is_escaped(oc) {
                    prop_assert_eq!(oc, nc);
                }
            }
        }

        /// Offset tables are monotone and sized `len + 1`.
        #[test]
        fn tables_are_monotone(s in "\\PC{0,40}") {
            let n = normalize(&s, &EscapeTable::default());
            let fwd = (0..=n.orig_len())
                .map(|i| n.to_normalized(i).unwrap())
                .collect::<Vec<_>>();
            prop_assert!(fwd.windows(2).all(|w| w[0] <= w[1]));
            let back = (0..=n.norm_len())
                .map(|i| n.to_original(i).unwrap())
                .collect::<Vec<_>>();
            prop_assert!(back.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
