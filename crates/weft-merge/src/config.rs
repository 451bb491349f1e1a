//! Merge configuration.

use serde::{Deserialize, Serialize};

use weft_align::{EscapeTable, OmitChars};

/// The recognized merge options.
///
/// All fields have serde defaults, so a configuration file only needs to
/// name the options it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Characters ignored during text alignment (punctuation by default).
    pub omit_chars: String,
    /// Character replacements applied during normalization; defaults to
    /// dropping whitespace and expanding German umlauts/ß to digraphs.
    pub escape_table: EscapeTable,
    /// When `true`, spans and structures are always duplicated into the
    /// base graph; when `false` (default), an existing base node with the
    /// identical child set is reused.
    pub copy_nodes: bool,
    /// When `true`, the first document of a group is the base document;
    /// otherwise the document with the most nodes and relations wins.
    pub first_as_base: bool,
    /// When `true`, only identically named primary texts are aligned
    /// against each other in the n:m cross product.
    pub only_same_named_texts: bool,
    /// Selects the indexed (filtered) substring search; `false` uses the
    /// streaming reference search instead.
    pub use_indexed_search: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            omit_chars: ".,:;!?(){}<>".to_string(),
            escape_table: EscapeTable::default(),
            copy_nodes: false,
            first_as_base: false,
            only_same_named_texts: false,
            use_indexed_search: true,
        }
    }
}

impl MergeConfig {
    /// The omit-character set in aligner form.
    pub fn omit(&self) -> OmitChars {
        self.omit_chars.chars().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MergeConfig::default();
        assert!(!config.copy_nodes);
        assert!(!config.first_as_base);
        assert!(config.use_indexed_search);
        assert!(config.omit().contains('?'));
        assert!(!config.omit().contains('a'));
        assert_eq!(config.escape_table.lookup('ä'), Some("ae"));
        assert_eq!(config.escape_table.lookup(' '), Some(""));
    }

    #[test]
    fn parses_from_toml_with_defaults() {
        let config: MergeConfig = toml::from_str(
            r#"
            copy_nodes = true
            omit_chars = ".,"

            [escape_table]
            "-" = ""
            "ß" = "ss"
            "#,
        )
        .unwrap();

        assert!(config.copy_nodes);
        assert!(!config.first_as_base);
        assert_eq!(config.omit_chars, ".,");
        assert_eq!(config.escape_table.lookup('-'), Some(""));
        assert_eq!(config.escape_table.lookup('ß'), Some("ss"));
        // Replaced wholesale, not merged with the default table.
        assert_eq!(config.escape_table.lookup('ä'), None);
    }
}
