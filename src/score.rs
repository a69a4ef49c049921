//! Per-artist features and heuristic scores.
//!
//! Every artist (person or musical group) gets one record per metric:
//!
//! - activity: Σ role weight × decay(work year) over creative credits
//! - influence: Σ relationship weight × decay(borrowing work year) over influence
//!   edges that point at the artist's works from works the artist is not credited on
//! - popularity: notable weight × Σ decay over distinct notable works
//! - composite: sum of the three
//!
//! Decay is `0.5^(age / half_life)` with age measured back from the reference year.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::rank;
use crate::config::ScoringConfig;
use crate::graph::{KnowledgeGraph, NodeId};
use crate::influence::credits_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Activity,
    Influence,
    Popularity,
    Composite,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Activity,
        Metric::Influence,
        Metric::Popularity,
        Metric::Composite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Influence => "influence",
            Self::Popularity => "popularity",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw and weighted features of one artist.
#[derive(Debug, Clone, Default)]
pub struct EntityFeatures {
    pub entity: NodeId,
    pub name: String,
    /// Credits per creative edge type.
    pub role_counts: BTreeMap<String, usize>,
    pub works: BTreeSet<NodeId>,
    pub notable_works: BTreeSet<NodeId>,
    /// Influence references received per edge type.
    pub references: BTreeMap<String, usize>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub weighted_activity: f64,
    pub weighted_influence: f64,
    pub weighted_popularity: f64,
}

impl EntityFeatures {
    fn credit_count(&self) -> usize {
        self.role_counts.values().sum()
    }

    fn reference_count(&self) -> usize {
        self.references.values().sum()
    }

    /// Whether any relationship feeds `metric`.
    pub fn qualifies(&self, metric: Metric) -> bool {
        match metric {
            Metric::Activity => self.credit_count() > 0,
            Metric::Influence => self.reference_count() > 0,
            Metric::Popularity => !self.notable_works.is_empty(),
            Metric::Composite => {
                self.credit_count() > 0 || self.reference_count() > 0
            }
        }
    }

    fn raw_score(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Activity => self.weighted_activity,
            Metric::Influence => self.weighted_influence,
            Metric::Popularity => self.weighted_popularity,
            Metric::Composite => {
                self.weighted_activity + self.weighted_influence + self.weighted_popularity
            }
        }
    }
}

/// One derived score for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub entity: NodeId,
    pub name: String,
    pub metric: Metric,
    pub value: f64,
    /// First and last release year of the works behind the score.
    pub window_start: Option<i32>,
    pub window_end: Option<i32>,
}

/// Year decay is measured from: configured, else the latest release in the graph.
pub fn reference_year(graph: &KnowledgeGraph, scoring: &ScoringConfig) -> i32 {
    scoring
        .reference_year
        .or_else(|| graph.year_range().map(|(_, hi)| hi))
        .unwrap_or(0)
}

/// Extract features for every artist, in key order.
pub fn extract_features(graph: &KnowledgeGraph, scoring: &ScoringConfig) -> Vec<EntityFeatures> {
    let reference = reference_year(graph, scoring);
    log::debug!("Scoring with reference year {reference}");

    graph
        .artists()
        .map(|artist| {
            let mut f = EntityFeatures {
                entity: artist.id,
                name: artist.display_name().to_string(),
                ..EntityFeatures::default()
            };

            for credit in credits_of(graph, artist.id) {
                let year = graph.work_year(credit.work);
                *f.role_counts
                    .entry(credit.edge_type.to_string())
                    .or_insert(0) += 1;
                f.weighted_activity += scoring.role_weight(&credit.edge_type)
                    * scoring.decay(year, reference);
                f.works.insert(credit.work);
                if let Some(y) = year {
                    f.first_year = Some(f.first_year.map_or(y, |fy| fy.min(y)));
                    f.last_year = Some(f.last_year.map_or(y, |ly| ly.max(y)));
                }
            }

            for &work in &f.works {
                if graph.entity(work).is_some_and(|w| w.notable) {
                    f.notable_works.insert(work);
                }
            }
            f.weighted_popularity = f
                .notable_works
                .iter()
                .map(|&w| scoring.notable_weight * scoring.decay(graph.work_year(w), reference))
                .sum();

            for &work in &f.works {
                for rel in graph.incoming(work) {
                    let from_work = graph.entity(rel.source).is_some_and(|e| e.node_type.is_work());
                    if !rel.edge_type.is_influence() || !from_work || f.works.contains(&rel.source) {
                        continue;
                    }
                    *f.references.entry(rel.edge_type.to_string()).or_insert(0) += 1;
                    f.weighted_influence += scoring.relationship_weight(&rel.edge_type)
                        * scoring.decay(graph.work_year(rel.source), reference);
                }
            }

            f
        })
        .collect()
}

/// Turn features into ranked score records for one metric.
pub fn score_features(features: &[EntityFeatures], metric: Metric, floor: f64) -> Vec<ScoreRecord> {
    let records = features
        .iter()
        .map(|f| ScoreRecord {
            entity: f.entity,
            name: f.name.clone(),
            metric,
            value: if f.qualifies(metric) {
                f.raw_score(metric)
            } else {
                floor
            },
            window_start: f.first_year,
            window_end: f.last_year,
        })
        .collect();
    rank(records)
}

/// Score every artist on `metric`, ranked descending with ties by key.
pub fn build_scores(graph: &KnowledgeGraph, scoring: &ScoringConfig, metric: Metric) -> Vec<ScoreRecord> {
    let features = extract_features(graph, scoring);
    score_features(&features, metric, scoring.floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeType;
    use crate::testutil::{GraphBuilder, scene};

    fn flat() -> ScoringConfig {
        ScoringConfig {
            half_life_years: 0.0,
            ..ScoringConfig::default()
        }
    }

    fn value_of(records: &[ScoreRecord], id: NodeId) -> f64 {
        records.iter().find(|r| r.entity == id).unwrap().value
    }

    #[test]
    fn test_isolated_entity_gets_floor() {
        let graph = scene();
        for metric in Metric::ALL {
            let records = build_scores(&graph, &flat(), metric);
            assert_eq!(value_of(&records, 5), 0.0, "{metric}");
        }

        let raised = ScoringConfig { floor: 0.25, ..flat() };
        let records = build_scores(&graph, &raised, Metric::Activity);
        assert_eq!(value_of(&records, 5), 0.25);
    }

    #[test]
    fn test_activity_uses_role_weights() {
        let graph = scene();
        let records = build_scores(&graph, &flat(), Metric::Activity);
        // Sailor: Performer 10, Performer 12, Composer 12, Lyricist 20
        assert!((value_of(&records, 1) - (1.0 + 1.0 + 0.8 + 0.6)).abs() < 1e-9);
        // Kai: Producer 20, Performer 20, Composer 21, Lyricist 25
        assert!((value_of(&records, 3) - (0.6 + 1.0 + 0.8 + 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_influence_skips_own_works() {
        let graph = scene();
        let records = build_scores(&graph, &flat(), Metric::Influence);
        // Into 10: 25 Interpolates (0.8), 11 Samples (1.0); 20 -> 10 is Sailor's own.
        // Into 12: 22 Samples (1.0); 20 -> 12 is Sailor's own.
        assert!((value_of(&records, 1) - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_influence_ignores_artist_sources() {
        // a person cited as working in the style of a song is not a work drawing on it
        let graph = GraphBuilder::new()
            .person(1, "Sailor Shift")
            .person(2, "Copycat")
            .song(10, "Tidal Pull", "Oceanus Folk", 2020)
            .edge(1, EdgeType::PerformerOf, 10)
            .edge(2, EdgeType::InStyleOf, 10)
            .build();
        let records = build_scores(&graph, &flat(), Metric::Influence);
        assert_eq!(value_of(&records, 1), 0.0);
        let features = extract_features(&graph, &flat());
        let sailor = features.iter().find(|f| f.entity == 1).unwrap();
        assert!(sailor.references.is_empty());
    }

    #[test]
    fn test_popularity_counts_distinct_notable_works() {
        let graph = scene();
        let records = build_scores(&graph, &flat(), Metric::Popularity);
        // 12 is credited twice but counted once
        assert_eq!(value_of(&records, 1), 2.0);
        assert_eq!(value_of(&records, 2), 1.0);
        assert_eq!(value_of(&records, 3), 0.0);
    }

    #[test]
    fn test_decay_reduces_old_credits() {
        let graph = GraphBuilder::new()
            .person(1, "Old Hand")
            .person(2, "New Voice")
            .song(10, "Then", "Americana", 2010)
            .song(11, "Now", "Americana", 2030)
            .edge(1, EdgeType::PerformerOf, 10)
            .edge(2, EdgeType::PerformerOf, 11)
            .build();
        let records = build_scores(&graph, &ScoringConfig::default(), Metric::Activity);
        assert_eq!(records[0].entity, 2);
        assert!((records[0].value - 1.0).abs() < 1e-9);
        assert!((records[1].value - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_sorted_with_key_tie_break() {
        let graph = scene();
        let records = build_scores(&graph, &flat(), Metric::Activity);
        for pair in records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.value > b.value || (a.value == b.value && a.entity < b.entity));
        }
        // Sailor and Kai tie on four credits when every role weighs 1
        let even = ScoringConfig {
            role_weights: BTreeMap::new(),
            ..flat()
        };
        let records = build_scores(&graph, &even, Metric::Activity);
        assert_eq!(records[0].entity, 1);
        assert_eq!(records[1].entity, 3);
        assert_eq!(records[0].value, records[1].value);
    }

    #[test]
    fn test_every_ranked_entity_exists() {
        let graph = scene();
        let records = build_scores(&graph, &ScoringConfig::default(), Metric::Composite);
        assert_eq!(records.len(), graph.artists().count());
        assert!(records.iter().all(|r| graph.contains(r.entity)));
    }

    #[test]
    fn test_deterministic() {
        let graph = scene();
        let a = build_scores(&graph, &ScoringConfig::default(), Metric::Composite);
        let b = build_scores(&scene(), &ScoringConfig::default(), Metric::Composite);
        assert_eq!(a, b);
    }

    #[test]
    fn test_window_covers_credited_years() {
        let graph = scene();
        let features = extract_features(&graph, &flat());
        let sailor = features.iter().find(|f| f.entity == 1).unwrap();
        assert_eq!(sailor.first_year, Some(2020));
        assert_eq!(sailor.last_year, Some(2026));
        assert_eq!(sailor.role_counts.get("PerformerOf"), Some(&2));
    }
}
