//! Hand-built graphs for unit tests.

use std::collections::BTreeMap;

use crate::graph::{EdgeType, Entity, KnowledgeGraph, NodeId, NodeType, Relationship};

#[derive(Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<Entity>,
    links: Vec<Relationship>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(
        mut self,
        id: NodeId,
        node_type: NodeType,
        name: &str,
        genre: Option<&str>,
        year: Option<i32>,
        notable: bool,
    ) -> Self {
        self.nodes.push(Entity {
            id,
            node_type,
            name: Some(name.to_string()),
            genre: genre.map(str::to_string),
            release_date: year.map(|y| y.to_string()),
            notable,
            metadata: BTreeMap::new(),
        });
        self
    }

    pub fn person(self, id: NodeId, name: &str) -> Self {
        self.node(id, NodeType::Person, name, None, None, false)
    }

    pub fn group(self, id: NodeId, name: &str) -> Self {
        self.node(id, NodeType::MusicalGroup, name, None, None, false)
    }

    pub fn song(self, id: NodeId, name: &str, genre: &str, year: i32) -> Self {
        self.node(id, NodeType::Song, name, Some(genre), Some(year), false)
    }

    pub fn notable_song(self, id: NodeId, name: &str, genre: &str, year: i32) -> Self {
        self.node(id, NodeType::Song, name, Some(genre), Some(year), true)
    }

    pub fn album(self, id: NodeId, name: &str, genre: &str, year: i32, notable: bool) -> Self {
        self.node(id, NodeType::Album, name, Some(genre), Some(year), notable)
    }

    /// A song with no genre attribute.
    pub fn untagged_song(self, id: NodeId, name: &str, year: i32) -> Self {
        self.node(id, NodeType::Song, name, None, Some(year), false)
    }

    pub fn edge(mut self, source: NodeId, edge_type: EdgeType, target: NodeId) -> Self {
        self.links.push(Relationship {
            source,
            target,
            edge_type,
            year: None,
        });
        self
    }

    pub fn build(self) -> KnowledgeGraph {
        KnowledgeGraph::from_parts(self.nodes, self.links).unwrap()
    }
}

/// A small Oceanus Folk scene shared by the analysis tests.
///
/// Influenced works (later, non-Oceanus works drawing on Oceanus works):
/// 20 → 10 and 20 → 12 (Synthwave, 2026), 21 → 11 (Doom Metal, 2027),
/// 25 → 10 (no genre, 2030). 22 → 12 is earlier than its target and does not count.
/// Inspirations: 10 → 23 (2020, Americana), 12 → 24 (2024, Desert Rock),
/// 12 → 23 (2024, Americana).
pub(crate) fn scene() -> KnowledgeGraph {
    use EdgeType::*;
    GraphBuilder::new()
        .person(1, "Sailor Shift")
        .person(2, "Ivy Echoes")
        .person(3, "Kai Rowan")
        .group(4, "The Tide Callers")
        .person(5, "Lone Drifter")
        .notable_song(10, "Tidal Hymn", "Oceanus Folk", 2020)
        .song(11, "Harbor Lights", "Oceanus Folk", 2022)
        .album(12, "Salt Lines", "Oceanus Folk", 2024, true)
        .song(20, "Neon Undertow", "Synthwave", 2026)
        .song(21, "Iron Gale", "Doom Metal", 2027)
        .song(22, "Lantern Room", "Indie Folk", 2023)
        .song(23, "Old Roots", "Americana", 2015)
        .song(24, "Dust Choir", "Desert Rock", 2018)
        .untagged_song(25, "Static Bloom", 2030)
        // influence
        .edge(20, InStyleOf, 10)
        .edge(21, CoverOf, 11)
        .edge(22, DirectlySamples, 12)
        .edge(20, LyricalReferenceTo, 12)
        .edge(25, InterpolatesFrom, 10)
        .edge(11, DirectlySamples, 10)
        .edge(10, InStyleOf, 23)
        .edge(12, CoverOf, 24)
        .edge(11, InStyleOf, 22)
        .edge(12, LyricalReferenceTo, 23)
        // credits
        .edge(1, PerformerOf, 10)
        .edge(1, PerformerOf, 12)
        .edge(1, ComposerOf, 12)
        .edge(2, PerformerOf, 11)
        .edge(2, ComposerOf, 10)
        .edge(3, ProducerOf, 20)
        .edge(3, PerformerOf, 20)
        .edge(3, ComposerOf, 21)
        .edge(3, LyricistOf, 25)
        .edge(4, PerformerOf, 21)
        .edge(4, PerformerOf, 22)
        .edge(1, LyricistOf, 20)
        .edge(2, MemberOf, 4)
        .build()
}
