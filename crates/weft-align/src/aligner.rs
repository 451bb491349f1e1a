//! Punctuation-insensitive substring alignment between normalized texts.
//!
//! Two search implementations are provided. [`index_of_omitted`] is the
//! indexed fast path: it strips the omit characters from the pattern,
//! filters the target once while keeping a kept-position table, runs a
//! plain substring search, and maps the hit back. [`index_of_omitted_scan`]
//! is the streaming reference path: a char-by-char comparison with
//! skip-ahead over omit characters and no pre-filtering. Both must return
//! the same offset on any input; the merge engine selects between them with
//! a configuration flag.

use std::collections::BTreeSet;

use tracing::debug;

use crate::normalize::NormalizedText;

/// The set of characters ignored during alignment matching.
///
/// Matching is additionally case-insensitive; the default set is common
/// sentence punctuation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OmitChars {
    chars: BTreeSet<char>,
}

impl OmitChars {
    /// Build the set from any iterator of characters.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            chars: chars.into_iter().collect(),
        }
    }

    /// Returns `true` if the character is ignored during matching.
    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }
}

impl Default for OmitChars {
    fn default() -> Self {
        Self::new(".,:;!?(){}<>".chars())
    }
}

impl FromIterator<char> for OmitChars {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Case-fold a char to the first scalar of its lowercase mapping, keeping
/// positions 1:1 with the input.
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Find the first position in `bigger` at which `smaller` occurs, ignoring
/// omit characters and case. Returns the char offset of the first matched
/// (non-omitted) character, or `None` if there is no occurrence.
///
/// Fast path: dense pattern + filtered target + kept-position table.
pub fn index_of_omitted(bigger: &str, smaller: &str, omit: &OmitChars) -> Option<usize> {
    let pattern: Vec<char> = smaller
        .chars()
        .map(fold)
        .filter(|&c| !omit.contains(c))
        .collect();
    if pattern.is_empty() {
        return Some(0);
    }

    // Filter the target once, remembering where each kept char came from.
    let mut kept: Vec<char> = Vec::new();
    let mut kept_pos: Vec<usize> = Vec::new();
    for (i, c) in bigger.chars().enumerate() {
        let f = fold(c);
        if !omit.contains(f) {
            kept.push(f);
            kept_pos.push(i);
        }
    }
    if pattern.len() > kept.len() {
        return None;
    }

    kept.windows(pattern.len())
        .position(|window| window == pattern.as_slice())
        .map(|i| kept_pos[i])
}

/// Streaming reference implementation of [`index_of_omitted`]: tries every
/// non-omitted start position in `bigger` and compares char by char,
/// skipping omit characters on both sides as they appear.
pub fn index_of_omitted_scan(bigger: &str, smaller: &str, omit: &OmitChars) -> Option<usize> {
    let small: Vec<char> = smaller.chars().map(fold).collect();
    if small.iter().all(|&c| omit.contains(c)) {
        return Some(0);
    }
    let big: Vec<char> = bigger.chars().map(fold).collect();

    'starts: for start in 0..big.len() {
        if omit.contains(big[start]) {
            continue;
        }
        let mut i = start;
        let mut j = 0;
        loop {
            while j < small.len() && omit.contains(small[j]) {
                j += 1;
            }
            if j == small.len() {
                return Some(start);
            }
            while i < big.len() && omit.contains(big[i]) {
                i += 1;
            }
            if i == big.len() || big[i] != small[j] {
                continue 'starts;
            }
            i += 1;
            j += 1;
        }
    }
    None
}

/// The result of aligning an other text against a base text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextAlignment {
    /// `true` if the base text is the bigger one (ties count as bigger).
    pub base_is_bigger: bool,
    /// Char offset into the bigger normalized text at which the smaller
    /// normalized text begins.
    pub offset: usize,
}

/// Determine whether one normalized text contains the other and where.
///
/// The longer normalized text is treated as the bigger one; on equal
/// lengths the base text wins. `use_indexed` selects the fast filtered
/// search, otherwise the streaming reference search is used. Returns
/// `None` when the smaller text does not occur in the bigger one.
pub fn align_texts(
    base: &NormalizedText,
    other: &NormalizedText,
    omit: &OmitChars,
    use_indexed: bool,
) -> Option<TextAlignment> {
    let base_is_bigger = base.norm_len() >= other.norm_len();
    let (bigger, smaller) = if base_is_bigger {
        (base.text(), other.text())
    } else {
        (other.text(), base.text())
    };
    let search = if use_indexed {
        index_of_omitted
    } else {
        index_of_omitted_scan
    };
    let offset = search(bigger, smaller, omit)?;
    debug!(offset, base_is_bigger, "aligned text pair");
    Some(TextAlignment {
        base_is_bigger,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, EscapeTable};
    use proptest::prelude::*;

    #[test]
    fn case_and_omit_insensitive_prefix() {
        let omit = OmitChars::default();
        assert_eq!(
            index_of_omitted("This,isasmallExample!", "This;is", &omit),
            Some(0)
        );
        assert_eq!(
            index_of_omitted_scan("This,isasmallExample!", "This;is", &omit),
            Some(0)
        );
    }

    #[test]
    fn match_across_omitted_boundary() {
        let omit = OmitChars::default();
        let bigger = "Thisisnosmallexample.Itisasmallerexample!";
        assert_eq!(index_of_omitted(bigger, "exampleItis", &omit), Some(13));
        assert_eq!(index_of_omitted_scan(bigger, "exampleItis", &omit), Some(13));
    }

    #[test]
    fn absent_pattern_is_none() {
        let omit = OmitChars::default();
        assert_eq!(index_of_omitted("abcdef", "xyz", &omit), None);
        assert_eq!(index_of_omitted_scan("abcdef", "xyz", &omit), None);
    }

    #[test]
    fn pattern_longer_than_target_is_none() {
        let omit = OmitChars::default();
        assert_eq!(index_of_omitted("ab", "abcd", &omit), None);
        assert_eq!(index_of_omitted_scan("ab", "abcd", &omit), None);
    }

    #[test]
    fn match_never_starts_on_an_omitted_char() {
        let omit = OmitChars::default();
        assert_eq!(index_of_omitted(",,abc", "abc", &omit), Some(2));
        assert_eq!(index_of_omitted_scan(",,abc", "abc", &omit), Some(2));
    }

    #[test]
    fn equal_lengths_treat_base_as_bigger() {
        let table = EscapeTable::default();
        let base = normalize("same text", &table);
        let other = normalize("sametext!", &table);
        // Both normalize to 9 chars; the base must take the bigger role.
        let alignment = align_texts(&base, &other, &OmitChars::default(), true).unwrap();
        assert!(alignment.base_is_bigger);
        assert_eq!(alignment.offset, 0);
    }

    #[test]
    fn other_text_can_be_bigger() {
        let table = EscapeTable::default();
        let base = normalize("small example", &table);
        let other = normalize("This is no small example", &table);
        let alignment = align_texts(&base, &other, &OmitChars::default(), true).unwrap();
        assert!(!alignment.base_is_bigger);
        assert_eq!(alignment.offset, 8);
    }

    #[test]
    fn unalignable_pair_is_none() {
        let table = EscapeTable::default();
        let base = normalize("completely different", &table);
        let other = normalize("nothing shared here at all", &table);
        assert!(align_texts(&base, &other, &OmitChars::default(), true).is_none());
    }

    proptest! {
        /// The indexed and the streaming search agree on every input.
        #[test]
        fn fast_and_slow_paths_agree(
            bigger in "[ab,\\.!A]{0,24}",
            smaller in "[ab,\\.!A]{0,6}",
        ) {
            let omit = OmitChars::default();
            prop_assert_eq!(
                index_of_omitted(&bigger, &smaller, &omit),
                index_of_omitted_scan(&bigger, &smaller, &omit)
            );
        }
    }
}
