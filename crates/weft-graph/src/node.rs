//! Node types and annotations of the document graph.
//!
//! [`NodeKind`] is a closed union over the four node kinds the model knows:
//! primary texts, tokens, spans, and structures. Code that dispatches on the
//! kind does so with an exhaustive `match`, so an unhandled kind is a
//! compile error rather than a runtime fault.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node within one [`DocumentGraph`](crate::DocumentGraph).
///
/// Ids are arena indices: allocation order is creation order, and iteration
/// over nodes is deterministic. Ids are only meaningful within the graph
/// that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A namespaced annotation key, e.g. `morph::pos`.
///
/// Serializes as its display form (`ns::name`) so annotation maps stay
/// plain string-keyed objects in JSON.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName {
    /// Optional namespace.
    pub ns: Option<String>,
    /// Local name.
    pub name: String,
}

impl QName {
    /// A namespaced key.
    pub fn new(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ns: Some(ns.into()),
            name: name.into(),
        }
    }

    /// A key without a namespace.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            ns: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}::{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.split_once("::") {
            Some((ns, name)) => QName::new(ns, name),
            None => QName::plain(s),
        })
    }
}

/// Namespaced key-value annotations attached to a node, relation, or layer.
///
/// Backed by a `BTreeMap` so iteration order is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations {
    entries: BTreeMap<QName, String>,
}

impl Annotations {
    /// An empty annotation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an annotation, replacing any previous value under the same key.
    pub fn set(&mut self, key: QName, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    /// Look up an annotation value.
    pub fn get(&self, key: &QName) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&QName, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Union `other` into `self`. Keys already present in `self` keep their
    /// existing value; only missing keys are copied over.
    pub fn absorb(&mut self, other: &Annotations) {
        for (key, value) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// The kind of a graph node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// An immutable primary text. Tokens anchor into it via textual
    /// relations carrying `[start, end)` char intervals.
    Text {
        /// The text content.
        content: String,
    },
    /// A leaf annotation node anchored to an interval of a primary text.
    Token,
    /// A node grouping a non-empty set of tokens via spanning relations.
    Span,
    /// A node grouping tokens, spans, or other structures via dominance
    /// relations. Structures form a DAG, not necessarily a tree.
    Structure,
}

impl NodeKind {
    /// Short lowercase label, used in log output.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Text { .. } => "text",
            NodeKind::Token => "token",
            NodeKind::Span => "span",
            NodeKind::Structure => "structure",
        }
    }
}

/// A node in the document graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// This node's id within its graph.
    pub id: NodeId,
    /// Optional name; primary texts use it for same-named-text matching.
    pub name: Option<String>,
    /// What kind of node this is.
    pub kind: NodeKind,
    /// Regular annotations.
    pub annos: Annotations,
    /// Meta annotations.
    pub meta: Annotations,
}

impl Node {
    /// Returns `true` if this node is a primary text.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    /// Returns `true` if this node is a token.
    pub fn is_token(&self) -> bool {
        matches!(self.kind, NodeKind::Token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_keeps_existing_values() {
        let mut target = Annotations::new();
        target.set(QName::new("syn", "cat"), "NP");

        let mut source = Annotations::new();
        source.set(QName::new("syn", "cat"), "VP");
        source.set(QName::new("morph", "pos"), "NN");

        target.absorb(&source);
        assert_eq!(target.get(&QName::new("syn", "cat")), Some("NP"));
        assert_eq!(target.get(&QName::new("morph", "pos")), Some("NN"));
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn qname_display() {
        assert_eq!(QName::new("ns", "k").to_string(), "ns::k");
        assert_eq!(QName::plain("k").to_string(), "k");
    }
}
