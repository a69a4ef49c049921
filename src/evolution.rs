//! How the target genre grew, how much of it the spotlight artist made, and
//! which older genres it kept drawing on.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::graph::{KnowledgeGraph, NodeId};
use crate::influence::{credits_of, inspiration_links, target_works};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionRow {
    pub year: i32,
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionKpis {
    pub target_total: usize,
    pub spotlight_total: usize,
    pub top_genre: String,
    pub peak_share: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionPayload {
    pub target_label: String,
    pub spotlight_label: String,
    pub rows: Vec<EvolutionRow>,
    pub kpis: EvolutionKpis,
}

/// First artist, in key order, whose trimmed name matches exactly.
pub fn find_artist(graph: &KnowledgeGraph, name: &str) -> Option<NodeId> {
    graph
        .artists()
        .find(|a| a.name.as_deref().map(str::trim) == Some(name.trim()))
        .map(|a| a.id)
}

fn tally(years: impl IntoIterator<Item = i32>) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for y in years {
        *counts.entry(y).or_insert(0) += 1;
    }
    counts
}

pub fn build_evolution(graph: &KnowledgeGraph, analysis: &AnalysisConfig) -> Result<EvolutionPayload> {
    let targets = target_works(graph, &analysis.target_genre);
    let target_years: BTreeMap<NodeId, i32> = targets
        .iter()
        .filter_map(|&id| graph.work_year(id).map(|y| (id, y)))
        .collect();
    if target_years.is_empty() {
        bail!("No dated {} works found", analysis.target_genre);
    }
    let target_by_year = tally(target_years.values().copied());

    let spotlight_works: BTreeSet<NodeId> = match find_artist(graph, &analysis.spotlight_artist) {
        Some(id) => credits_of(graph, id)
            .into_iter()
            .map(|c| c.work)
            .filter(|w| target_years.contains_key(w))
            .collect(),
        None => {
            log::warn!("Spotlight artist {:?} not found", analysis.spotlight_artist);
            BTreeSet::new()
        }
    };
    let spotlight_by_year = tally(spotlight_works.iter().map(|w| target_years[w]));

    let mut inspirations: BTreeMap<(i32, String), usize> = BTreeMap::new();
    for link in inspiration_links(graph, &targets) {
        let genre = graph
            .entity(link.target)
            .and_then(|w| w.genre())
            .unwrap_or("Unknown");
        *inspirations
            .entry((link.source_year, genre.to_string()))
            .or_insert(0) += 1;
    }

    let target_label = analysis.target_genre.clone();
    let spotlight_label = format!("{} ({})", analysis.spotlight_artist, analysis.target_genre);

    let mut combined = inspirations.clone();
    for (&y, &n) in &target_by_year {
        *combined.entry((y, target_label.clone())).or_insert(0) += n;
    }
    for (&y, &n) in &spotlight_by_year {
        *combined.entry((y, spotlight_label.clone())).or_insert(0) += n;
    }

    let mut rows: Vec<EvolutionRow> = combined
        .into_iter()
        .filter(|&(_, n)| n > 0)
        .map(|((year, genre), count)| EvolutionRow { year, genre, count })
        .collect();
    // Within a year: target genre, spotlight series, then alphabetical
    let rank = |genre: &str| {
        if genre == target_label {
            0
        } else if genre == spotlight_label {
            1
        } else {
            2
        }
    };
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| rank(&a.genre).cmp(&rank(&b.genre)))
            .then_with(|| a.genre.cmp(&b.genre))
    });

    let mut genre_totals: BTreeMap<&str, usize> = BTreeMap::new();
    for ((_, genre), n) in &inspirations {
        *genre_totals.entry(genre).or_insert(0) += n;
    }
    let top_genre = genre_totals
        .iter()
        .fold(None, |best: Option<(&str, usize)>, (&g, &n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((g, n)),
        })
        .map_or_else(|| "—".to_string(), |(g, n)| format!("{g} ({n})"));

    // Year where the spotlight artist made the largest share of the genre; first wins ties
    let mut peak: Option<(i32, f64)> = None;
    for (&year, &n) in &target_by_year {
        let share = spotlight_by_year.get(&year).copied().unwrap_or(0) as f64 / n as f64;
        if share > peak.map_or(0.0, |(_, s)| s) {
            peak = Some((year, share));
        }
    }
    let peak_share = peak.map_or_else(
        || "—".to_string(),
        |(year, share)| format!("{} ({:.0}%)", year, share * 100.0),
    );

    let kpis = EvolutionKpis {
        target_total: target_by_year.values().sum(),
        spotlight_total: spotlight_by_year.values().sum(),
        top_genre,
        peak_share,
    };
    log::info!(
        "{} {} works, {} by {}",
        kpis.target_total,
        analysis.target_genre,
        kpis.spotlight_total,
        analysis.spotlight_artist
    );

    Ok(EvolutionPayload {
        target_label,
        spotlight_label,
        rows,
        kpis,
    })
}
