//! Text normalization and alignment for weft.
//!
//! Two independently produced renditions of "the same" text rarely agree
//! byte for byte: they differ in whitespace, diacritic encoding, and
//! punctuation. This crate makes them comparable in two steps:
//!
//! 1. [`normalize`] rewrites a text through an [`EscapeTable`] (dropping
//!    whitespace, expanding umlauts, ...) while keeping bidirectional
//!    char-offset tables back to the original, so intervals can be mapped
//!    in either direction.
//! 2. [`align_texts`] finds where one normalized text occurs inside the
//!    other, ignoring a configurable set of punctuation characters.

pub mod aligner;
pub mod error;
pub mod normalize;

pub use aligner::{
    align_texts, index_of_omitted, index_of_omitted_scan, OmitChars, TextAlignment,
};
pub use error::{AlignError, AlignResult};
pub use normalize::{normalize, EscapeTable, NormalizedText};
