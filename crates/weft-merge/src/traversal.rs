//! Bottom-up graph-merge traversal.
//!
//! [`MergeHandler`] walks the *other* graph post-order (children before
//! parents) and extends the token-level equivalence map upward: tokens are
//! resolved or created, spans and structures are reused when an identical
//! base node exists or created otherwise, and annotations, relation types,
//! and layer memberships migrate onto the result. Pointing relations are
//! excluded from the walk and merged afterwards by
//! [`merge_pointing_relations`].

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use weft_graph::{
    DocumentGraph, NodeId, NodeKind, Relation, RelationId, RelationKind, TraversalHandler,
};

use crate::equivalence::EquivalenceIndex;
use crate::error::{MergeError, MergeResult};

/// Which hierarchical parent kind is being merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParentKind {
    Span,
    Structure,
}

/// The traversal handler folding one other graph into the base graph.
pub struct MergeHandler<'a> {
    base: &'a mut DocumentGraph,
    index: &'a mut EquivalenceIndex,
    /// When `true`, spans and structures are always duplicated instead of
    /// reusing an identical base node.
    copy_nodes: bool,
    /// Other-graph nodes that legitimately have no footing in the base
    /// (tokens on unaligned texts and anything built solely over them).
    unmappable: HashSet<NodeId>,
}

impl<'a> MergeHandler<'a> {
    /// Create a handler writing into `base`, resolving through `index`.
    pub fn new(
        base: &'a mut DocumentGraph,
        index: &'a mut EquivalenceIndex,
        copy_nodes: bool,
    ) -> Self {
        Self {
            base,
            index,
            copy_nodes,
            unmappable: HashSet::new(),
        }
    }

    /// Number of other-graph nodes that could not be given a base
    /// equivalent (diagnostic).
    pub fn unmappable_count(&self) -> usize {
        self.unmappable.len()
    }

    // ---------------------------------------------------------------
    // Token case
    // ---------------------------------------------------------------

    /// Resolve or create the base equivalent of an other-graph token.
    fn merge_token(&mut self, other: &DocumentGraph, token: NodeId) -> MergeResult<()> {
        if let Some(base_token) = self.index.equivalent(token) {
            // Already resolved during token alignment; annotations and
            // layers still need to migrate.
            self.migrate_node(other, token, base_token);
            return Ok(());
        }
        let (text, span) = match self.index.other_token_span(token) {
            Some(found) => found,
            None => {
                // The token's text was never registered; treat like an
                // unanchored token below.
                let (text, _, _) = other
                    .token_interval(token)
                    .ok_or(MergeError::UnanchoredToken(token))?;
                warn!(%token, %text, "token on unregistered text, leaving unmapped");
                self.unmappable.insert(token);
                return Ok(());
            }
        };
        let Some(&link) = self.index.link_for_other_text(text) else {
            warn!(%token, %text, "token on unaligned text, leaving unmapped");
            self.unmappable.insert(token);
            return Ok(());
        };

        let base_start = link
            .other_to_base(span.start)
            .ok_or(MergeError::NegativeOffset {
                token,
                start: span.start,
                offset: link.offset,
            })?;

        let base_len = self
            .index
            .base_normalized(link.base_text)
            .map(|n| n.norm_len())
            .unwrap_or(0);
        if base_start + span.len > base_len {
            // The token lies beyond the base text's right edge; it has no
            // textual footing in the base document.
            warn!(%token, base_start, len = span.len, "token outside base text, leaving unmapped");
            self.unmappable.insert(token);
            return Ok(());
        }

        let base_token = match self.index.base_token_at(link.base_text, base_start, span.len) {
            Some(existing) => existing,
            None => self.index.create_base_token(
                self.base,
                link.base_text,
                token,
                base_start,
                span.len,
            )?,
        };
        self.index.record_equivalence(token, base_token);
        self.migrate_node(other, token, base_token);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Span / structure case
    // ---------------------------------------------------------------

    /// Merge a span or structure whose children are already resolved.
    fn merge_parent_node(
        &mut self,
        other: &DocumentGraph,
        node: NodeId,
        kind: ParentKind,
    ) -> MergeResult<()> {
        let other_children = match kind {
            ParentKind::Span => other.spanned_tokens(node),
            ParentKind::Structure => other.dominated_children(node),
        };

        // Post-order guarantees every mappable child has been handled; an
        // unexplained miss is a broken invariant.
        let mut resolved: Vec<NodeId> = Vec::with_capacity(other_children.len());
        for child in other_children {
            match self.index.equivalent(child) {
                Some(base_child) => {
                    if !resolved.contains(&base_child) {
                        resolved.push(base_child);
                    }
                }
                None if self.unmappable.contains(&child) => {
                    warn!(parent = %node, %child, "skipping child without base footing");
                }
                None => {
                    return Err(MergeError::MissingEquivalent {
                        child,
                        parent: node,
                    })
                }
            }
        }
        if resolved.is_empty() {
            warn!(%node, "no child has a base equivalent, leaving node unmapped");
            self.unmappable.insert(node);
            return Ok(());
        }

        let reused = if self.copy_nodes {
            None
        } else {
            self.shared_parent(&resolved, kind)
        };
        let result = match reused {
            Some(existing) => {
                debug!(%node, base = %existing, "reusing base node with identical children");
                existing
            }
            None => match kind {
                ParentKind::Span => self.base.create_span(&resolved)?,
                ParentKind::Structure => self.base.create_structure(&resolved)?,
            },
        };

        self.index.record_equivalence(node, result);
        self.migrate_node(other, node, result);
        self.migrate_child_relations(other, node, result);
        Ok(())
    }

    /// Find a base node of the requested kind whose child set is exactly
    /// the resolved set: intersect the base parents over all children, then
    /// check for exact equality. Ties go to the lowest node id.
    fn shared_parent(&self, children: &[NodeId], kind: ParentKind) -> Option<NodeId> {
        let wanted_kind = |n: &weft_graph::Node| match kind {
            ParentKind::Span => matches!(n.kind, NodeKind::Span),
            ParentKind::Structure => matches!(n.kind, NodeKind::Structure),
        };

        let mut candidates: BTreeSet<NodeId> = self
            .base
            .parents_of(*children.first()?)
            .into_iter()
            .filter(|&p| self.base.node(p).is_some_and(&wanted_kind))
            .collect();
        for &child in &children[1..] {
            if candidates.is_empty() {
                return None;
            }
            let parents: HashSet<NodeId> = self.base.parents_of(child).into_iter().collect();
            candidates.retain(|c| parents.contains(c));
        }

        let wanted: BTreeSet<NodeId> = children.iter().copied().collect();
        candidates.into_iter().find(|&candidate| {
            let child_set: BTreeSet<NodeId> = match kind {
                ParentKind::Span => self.base.spanned_tokens(candidate),
                ParentKind::Structure => self.base.dominated_children(candidate),
            }
            .into_iter()
            .collect();
            child_set == wanted
        })
    }

    // ---------------------------------------------------------------
    // Migration helpers
    // ---------------------------------------------------------------

    /// Move a node's annotations, meta annotations, and layer memberships
    /// onto its base result. Existing base keys win on conflict.
    fn migrate_node(&mut self, other: &DocumentGraph, source: NodeId, result: NodeId) {
        if let (Some(src), Some(dst)) = (other.node(source), self.base.node_mut(result)) {
            dst.annos.absorb(&src.annos);
            dst.meta.absorb(&src.meta);
        }
        for layer_id in other.layers_of_node(source) {
            if let Some(layer) = other.layer(layer_id) {
                let base_layer = self.mirror_layer(layer);
                self.base.add_node_to_layer(base_layer, result);
            }
        }
    }

    /// For every outgoing hierarchical relation of the source node, find
    /// the result's outgoing relation with the corresponding target and
    /// move relation annotations and the relation type onto it.
    fn migrate_child_relations(&mut self, other: &DocumentGraph, source: NodeId, result: NodeId) {
        for &other_rid in other.out_relations(source) {
            let Some(other_rel) = other.relation(other_rid) else {
                continue;
            };
            if !other_rel.kind.is_parental() {
                continue;
            }
            let Some(base_child) = self.index.equivalent(other_rel.target) else {
                continue;
            };
            let Some(base_rid) = self
                .base
                .out_relations(result)
                .iter()
                .copied()
                .find(|&rid| {
                    self.base
                        .relation(rid)
                        .is_some_and(|r| r.kind.is_parental() && r.target == base_child)
                })
            else {
                continue;
            };

            let (annos, meta, dom_type) = {
                let dom_type = match &other_rel.kind {
                    RelationKind::Dominance { dom_type } => dom_type.clone(),
                    _ => None,
                };
                (other_rel.annos.clone(), other_rel.meta.clone(), dom_type)
            };
            if let Some(base_rel) = self.base.relation_mut(base_rid) {
                base_rel.annos.absorb(&annos);
                base_rel.meta.absorb(&meta);
                if let (
                    RelationKind::Dominance { dom_type: existing },
                    Some(migrated),
                ) = (&mut base_rel.kind, dom_type)
                {
                    existing.get_or_insert(migrated);
                }
            }
            self.mirror_relation_layers(other, other_rid, base_rid);
        }
    }

    /// Mirror an other-graph layer into the base graph by name, migrating
    /// its annotations, and return the base layer id.
    fn mirror_layer(&mut self, source: &weft_graph::Layer) -> weft_graph::LayerId {
        let base_layer = self.base.create_layer(&source.name);
        if let Some(layer) = self.base.layer_mut(base_layer) {
            layer.annos.absorb(&source.annos);
            layer.meta.absorb(&source.meta);
        }
        base_layer
    }

    /// Mirror the layer memberships of a relation onto its base result.
    fn mirror_relation_layers(
        &mut self,
        other: &DocumentGraph,
        source: RelationId,
        result: RelationId,
    ) {
        for layer_id in other.layers_of_relation(source) {
            if let Some(layer) = other.layer(layer_id) {
                let base_layer = self.mirror_layer(layer);
                self.base.add_relation_to_layer(base_layer, result);
            }
        }
    }
}

impl TraversalHandler for MergeHandler<'_> {
    type Error = MergeError;

    fn check_edge(&self, _graph: &DocumentGraph, relation: &Relation) -> bool {
        // Pointing relations may form cycles; they are merged in a
        // separate pass after the hierarchical walk.
        relation.kind.is_hierarchical()
    }

    fn node_entered(&mut self, _graph: &DocumentGraph, _node: NodeId, _via: Option<RelationId>) {}

    fn node_left(
        &mut self,
        graph: &DocumentGraph,
        node: NodeId,
        _via: Option<RelationId>,
    ) -> Result<(), MergeError> {
        let kind = match graph.node(node) {
            Some(n) => &n.kind,
            None => return Ok(()),
        };
        match kind {
            NodeKind::Text { .. } => Ok(()), // texts are merged at token-alignment time
            NodeKind::Token => self.merge_token(graph, node),
            NodeKind::Span => self.merge_parent_node(graph, node, ParentKind::Span),
            NodeKind::Structure => self.merge_parent_node(graph, node, ParentKind::Structure),
        }
    }
}

/// Merge the other graph's pointing relations into the base graph.
///
/// Runs after the hierarchical traversal, once the equivalence map covers
/// everything that can be covered. A relation whose endpoints do not both
/// resolve is skipped with a warning; an equal-typed relation already
/// connecting the resolved endpoints is skipped silently.
pub fn merge_pointing_relations(
    base: &mut DocumentGraph,
    other: &DocumentGraph,
    index: &EquivalenceIndex,
) -> MergeResult<usize> {
    let mut created = 0;
    for rid in other.pointing_relations() {
        let Some(rel) = other.relation(rid) else {
            continue;
        };
        let (Some(src), Some(tgt)) = (index.equivalent(rel.source), index.equivalent(rel.target))
        else {
            warn!(
                relation = %rid,
                source = %rel.source,
                target = %rel.target,
                "pointing relation endpoint has no equivalent, skipping"
            );
            continue;
        };
        let ptr_type = match &rel.kind {
            RelationKind::Pointing { ptr_type } => ptr_type.clone(),
            _ => continue,
        };

        let duplicate = base.out_relations(src).iter().any(|&brid| {
            base.relation(brid).is_some_and(|br| {
                br.target == tgt
                    && matches!(&br.kind, RelationKind::Pointing { ptr_type: t } if *t == ptr_type)
            })
        });
        if duplicate {
            debug!(source = %src, target = %tgt, "equal-typed pointing relation exists, skipping");
            continue;
        }

        let new_rid = base.create_pointing(src, tgt, ptr_type)?;
        if let Some(new_rel) = base.relation_mut(new_rid) {
            new_rel.annos.absorb(&rel.annos);
            new_rel.meta.absorb(&rel.meta);
        }
        for layer_id in other.layers_of_relation(rid) {
            if let Some(layer) = other.layer(layer_id) {
                let base_layer = base.create_layer(&layer.name);
                if let Some(l) = base.layer_mut(base_layer) {
                    l.annos.absorb(&layer.annos);
                    l.meta.absorb(&layer.meta);
                }
                base.add_relation_to_layer(base_layer, new_rid);
            }
        }
        created += 1;
    }
    Ok(created)
}
