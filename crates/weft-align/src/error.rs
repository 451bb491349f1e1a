//! Error types for normalization and alignment.

/// Errors that can occur during offset-table lookups.
///
/// These indicate an internal inconsistency (a malformed or out-of-sync
/// offset table), not bad input: the tables are built together with the
/// normalized text and must cover every position up to and including the
/// sentinel at the extreme right.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// A position lookup ran past the end of an offset table.
    #[error("offset {offset} out of offset table of size {size} ({direction})")]
    OffsetOutOfTable {
        /// The requested position.
        offset: usize,
        /// Number of entries in the table.
        size: usize,
        /// Which table: `"original->normalized"` or `"normalized->original"`.
        direction: &'static str,
    },
}

/// Convenience alias for alignment results.
pub type AlignResult<T> = Result<T, AlignError>;
