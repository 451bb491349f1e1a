//! Layers: named, annotatable groupings of nodes and relations.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Annotations, NodeId};
use crate::relation::RelationId;

/// Identifier of a layer within one [`DocumentGraph`](crate::DocumentGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// A named grouping of nodes and relations, itself annotatable.
///
/// Layers typically correspond to annotation layers such as `morphology`
/// or `syntax`. Membership sets are ordered for deterministic iteration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// This layer's id within its graph.
    pub id: LayerId,
    /// The layer name; unique within a graph.
    pub name: String,
    /// Member nodes.
    pub nodes: BTreeSet<NodeId>,
    /// Member relations.
    pub relations: BTreeSet<RelationId>,
    /// Regular annotations.
    pub annos: Annotations,
    /// Meta annotations.
    pub meta: Annotations,
}

impl Layer {
    /// Returns `true` if the node is a member of this layer.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Returns `true` if the relation is a member of this layer.
    pub fn contains_relation(&self, relation: RelationId) -> bool {
        self.relations.contains(&relation)
    }
}
