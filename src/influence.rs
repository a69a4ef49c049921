//! Shared selections over the graph: target-genre works, influence links in
//! both directions, and creative credits.

use std::collections::BTreeSet;

use crate::graph::{EdgeType, Entity, KnowledgeGraph, NodeId};

/// A dated influence edge between two works.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceLink {
    /// The work doing the borrowing (edge source).
    pub source: NodeId,
    /// The work being drawn on (edge target).
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub source_year: i32,
    pub target_year: i32,
}

/// An artist credited on a work.
#[derive(Debug, Clone, PartialEq)]
pub struct Credit {
    pub artist: NodeId,
    pub work: NodeId,
    pub edge_type: EdgeType,
}

impl Credit {
    pub fn role(&self) -> &'static str {
        self.edge_type.role().unwrap_or("Contributor")
    }
}

/// Whether a work's genre matches `target` (trimmed, case-insensitive).
pub fn in_genre(entity: &Entity, target: &str) -> bool {
    entity
        .genre()
        .is_some_and(|g| g.eq_ignore_ascii_case(target.trim()))
}

/// Songs and albums of the target genre.
pub fn target_works(graph: &KnowledgeGraph, target: &str) -> BTreeSet<NodeId> {
    graph
        .works()
        .filter(|w| in_genre(w, target))
        .map(|w| w.id)
        .collect()
}

/// Dated influence edges between two works, in input order.
fn dated_influence_links(graph: &KnowledgeGraph) -> impl Iterator<Item = InfluenceLink> + '_ {
    graph
        .relationships()
        .iter()
        .filter(|r| r.edge_type.is_influence())
        .filter_map(|r| {
            let source_year = graph.work_year(r.source)?;
            let target_year = graph.work_year(r.target)?;
            Some(InfluenceLink {
                source: r.source,
                target: r.target,
                edge_type: r.edge_type.clone(),
                source_year,
                target_year,
            })
        })
}

/// Works outside the target genre that draw on a target-genre work released earlier.
///
/// One entry per edge, so a work borrowing from two target works appears twice.
pub fn influenced_links(graph: &KnowledgeGraph, targets: &BTreeSet<NodeId>) -> Vec<InfluenceLink> {
    dated_influence_links(graph)
        .filter(|l| targets.contains(&l.target) && !targets.contains(&l.source))
        .filter(|l| l.source_year > l.target_year)
        .collect()
}

/// Earlier works outside the target genre that target-genre works draw on.
pub fn inspiration_links(graph: &KnowledgeGraph, targets: &BTreeSet<NodeId>) -> Vec<InfluenceLink> {
    dated_influence_links(graph)
        .filter(|l| targets.contains(&l.source) && !targets.contains(&l.target))
        .filter(|l| l.target_year < l.source_year)
        .collect()
}

/// Creative credits from artists onto any of `works`, in input order.
pub fn credits_on(graph: &KnowledgeGraph, works: &BTreeSet<NodeId>) -> Vec<Credit> {
    graph
        .relationships()
        .iter()
        .filter(|r| r.edge_type.is_creative() && works.contains(&r.target))
        .filter(|r| graph.entity(r.source).is_some_and(|e| e.node_type.is_artist()))
        .map(|r| Credit {
            artist: r.source,
            work: r.target,
            edge_type: r.edge_type.clone(),
        })
        .collect()
}

/// Every creative credit an artist holds on a song or album, in input order.
pub fn credits_of(graph: &KnowledgeGraph, artist: NodeId) -> Vec<Credit> {
    graph
        .outgoing(artist)
        .filter(|r| r.edge_type.is_creative())
        .filter(|r| graph.entity(r.target).is_some_and(|e| e.node_type.is_work()))
        .map(|r| Credit {
            artist,
            work: r.target,
            edge_type: r.edge_type.clone(),
        })
        .collect()
}
