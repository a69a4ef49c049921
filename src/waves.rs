//! Influence waves: how many later works in each genre family drew on the
//! target genre, year by year.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::chart::CountSeries;
use crate::config::AnalysisConfig;
use crate::genres::{Family, GenreMap};
use crate::graph::KnowledgeGraph;
use crate::influence::{influenced_links, target_works};

const TARGET_COLOR: &str = "#111827";

/// year → family → subgenre → count
pub type SubgenreBreakdown = BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WavesKpis {
    pub total_influenced: usize,
    pub peak_year: i32,
    pub peak_count: usize,
    pub top_family: String,
    pub top_family_count: usize,
    pub span_start: i32,
    pub span_end: i32,
    pub target_total: usize,
    pub pulse_start: i32,
    pub pulse_end: i32,
    pub pulse_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WavesPayload {
    pub years: Vec<i32>,
    pub group_order: Vec<String>,
    /// One series per family, in canonical order.
    pub series: Vec<CountSeries>,
    /// Target-genre releases per year.
    pub target: CountSeries,
    pub totals: Vec<usize>,
    pub tooltip: SubgenreBreakdown,
    pub target_by_year: BTreeMap<String, usize>,
    pub kpis: WavesKpis,
}

/// Count influenced works per year and family.
pub fn build_waves(
    graph: &KnowledgeGraph,
    genres: &GenreMap,
    analysis: &AnalysisConfig,
) -> Result<WavesPayload> {
    let targets = target_works(graph, &analysis.target_genre);
    let links = influenced_links(graph, &targets);
    if links.is_empty() {
        bail!("No influenced works found for {}", analysis.target_genre);
    }

    let mut counts: BTreeMap<(i32, Family), usize> = BTreeMap::new();
    let mut tooltip = SubgenreBreakdown::new();
    for link in &links {
        let genre = graph.entity(link.source).and_then(|w| w.genre());
        let family = genres.family(genre);
        *counts.entry((link.source_year, family)).or_insert(0) += 1;
        *tooltip
            .entry(link.source_year.to_string())
            .or_default()
            .entry(family.name().to_string())
            .or_default()
            .entry(genre.unwrap_or("Unknown").to_string())
            .or_insert(0) += 1;
    }

    let mut target_by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for year in targets.iter().filter_map(|&id| graph.work_year(id)) {
        *target_by_year.entry(year).or_insert(0) += 1;
    }

    let years: Vec<i32> = counts
        .keys()
        .map(|&(y, _)| y)
        .chain(target_by_year.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series: Vec<CountSeries> = Family::ALL
        .into_iter()
        .map(|family| CountSeries {
            name: family.name().to_string(),
            data: years
                .iter()
                .map(|&y| counts.get(&(y, family)).copied().unwrap_or(0))
                .collect(),
            color: Some(family.color().to_string()),
        })
        .collect();

    let totals: Vec<usize> = (0..years.len())
        .map(|i| series.iter().map(|s| s.data[i]).sum())
        .collect();

    let target = CountSeries {
        name: format!("{} works", analysis.target_genre),
        data: years
            .iter()
            .map(|y| target_by_year.get(y).copied().unwrap_or(0))
            .collect(),
        color: Some(TARGET_COLOR.to_string()),
    };

    let kpis = compute_kpis(&years, &series, &totals, &target, analysis);
    log::info!(
        "{} influenced works across {} years, peak {} ({})",
        kpis.total_influenced,
        years.len(),
        kpis.peak_year,
        kpis.peak_count
    );

    Ok(WavesPayload {
        years,
        group_order: Family::ALL.iter().map(|f| f.name().to_string()).collect(),
        series,
        target,
        totals,
        tooltip,
        target_by_year: target_by_year
            .into_iter()
            .map(|(y, n)| (y.to_string(), n))
            .collect(),
        kpis,
    })
}

fn compute_kpis(
    years: &[i32],
    series: &[CountSeries],
    totals: &[usize],
    target: &CountSeries,
    analysis: &AnalysisConfig,
) -> WavesKpis {
    // First year with the highest total
    let (peak_year, peak_count) = years
        .iter()
        .zip(totals)
        .fold((years[0], 0), |best, (&y, &n)| if n > best.1 { (y, n) } else { best });

    let (top_family, top_family_count) = series
        .iter()
        .map(|s| (s.name.as_str(), s.data.iter().sum::<usize>()))
        .fold(("", 0), |best, (name, n)| {
            if n > best.1 || best.0.is_empty() { (name, n) } else { best }
        });

    let pulse_total = years
        .iter()
        .zip(totals)
        .filter(|&(&y, _)| (analysis.pulse_start..=analysis.pulse_end).contains(&y))
        .map(|(_, &n)| n)
        .sum();

    WavesKpis {
        total_influenced: totals.iter().sum(),
        peak_year,
        peak_count,
        top_family: top_family.to_string(),
        top_family_count,
        span_start: years[0],
        span_end: years[years.len() - 1],
        target_total: target.data.iter().sum(),
        pulse_start: analysis.pulse_start,
        pulse_end: analysis.pulse_end,
        pulse_total,
    }
}
