use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::genres::{Family, GenreMap};
use crate::graph::{KnowledgeGraph, NodeId};
use crate::influence::credits_of;
use crate::score::ScoreRecord;

/// How score records are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// A single group holding everything.
    Overall,
    /// The artist's dominant genre family.
    GenreFamily,
    /// The artist's first active year, floored to buckets of this many years.
    TimeBucket(u32),
}

impl Dimension {
    pub fn slug(self) -> String {
        match self {
            Self::Overall => "overall".to_string(),
            Self::GenreFamily => "family".to_string(),
            Self::TimeBucket(w) => format!("bucket{w}"),
        }
    }
}

/// Group key. Derived ordering is the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    All,
    Family(Family),
    /// First year of the bucket.
    Bucket(i32),
    Unknown,
}

/// One group of ranked records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub category: Category,
    pub label: String,
    /// Sum of every score in the group, before truncation.
    pub total: f64,
    pub ranking: Vec<ScoreRecord>,
}

/// Descending by score, ties broken by ascending entity key.
pub fn compare_records(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.value
        .total_cmp(&a.value)
        .then_with(|| a.entity.cmp(&b.entity))
}

/// Sort records into a ranking.
pub fn rank(mut records: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
    records.sort_by(compare_records);
    records
}

/// Label for a bucket starting at `start`.
pub fn bucket_label(start: i32, width: u32) -> String {
    match width {
        0 | 1 => start.to_string(),
        10 if start % 10 == 0 => format!("{start}s"),
        w => format!("{}-{}", start, start + w as i32 - 1),
    }
}

/// Family most of an artist's credited works belong to.
///
/// Works without a genre are ignored; ties go to the earlier family in
/// canonical order; `None` when nothing is left.
pub fn dominant_family(graph: &KnowledgeGraph, genres: &GenreMap, artist: NodeId) -> Option<Family> {
    let works: BTreeSet<NodeId> = credits_of(graph, artist).into_iter().map(|c| c.work).collect();
    let mut counts: BTreeMap<Family, usize> = BTreeMap::new();
    for work in works {
        if let Some(genre) = graph.entity(work).and_then(|w| w.genre()) {
            *counts.entry(genres.family(Some(genre))).or_insert(0) += 1;
        }
    }
    // BTreeMap iterates in canonical order, so the first max wins ties
    counts
        .into_iter()
        .fold(None, |best: Option<(Family, usize)>, (family, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((family, n)),
        })
        .map(|(family, _)| family)
}

fn categorize(
    record: &ScoreRecord,
    graph: &KnowledgeGraph,
    genres: &GenreMap,
    dimension: Dimension,
) -> Category {
    match dimension {
        Dimension::Overall => Category::All,
        Dimension::GenreFamily => dominant_family(graph, genres, record.entity)
            .map(Category::Family)
            .unwrap_or(Category::Unknown),
        Dimension::TimeBucket(width) => match record.window_start {
            Some(year) => {
                let w = width.max(1) as i32;
                Category::Bucket(year.div_euclid(w) * w)
            }
            None => Category::Unknown,
        },
    }
}

fn category_label(category: Category, dimension: Dimension) -> String {
    match category {
        Category::All => "All".to_string(),
        Category::Family(f) => f.name().to_string(),
        Category::Bucket(start) => match dimension {
            Dimension::TimeBucket(w) => bucket_label(start, w),
            _ => start.to_string(),
        },
        Category::Unknown => "Unknown".to_string(),
    }
}

/// Group score records by `dimension` and rank each group.
///
/// Groups come back in category order; each ranking is cut to `limit` entries
/// when one is given.
pub fn group_by(
    records: &[ScoreRecord],
    graph: &KnowledgeGraph,
    genres: &GenreMap,
    dimension: Dimension,
    limit: Option<usize>,
) -> Vec<Aggregate> {
    let mut groups: BTreeMap<Category, Vec<ScoreRecord>> = BTreeMap::new();
    for record in records {
        let category = categorize(record, graph, genres, dimension);
        groups.entry(category).or_default().push(record.clone());
    }

    groups
        .into_iter()
        .map(|(category, members)| {
            let total = members.iter().map(|r| r.value).sum();
            let mut ranking = rank(members);
            if let Some(n) = limit {
                ranking.truncate(n);
            }
            Aggregate {
                category,
                label: category_label(category, dimension),
                total,
                ranking,
            }
        })
        .collect()
}
