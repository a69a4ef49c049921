//! Rising-star forecast: project each target-genre artist's cumulative
//! activity, collaborator reach and notable output a few years ahead, then
//! group artists with similar outlooks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::cluster::{self, kmeans, silhouette};
use crate::config::{AnalysisConfig, ForecastConfig};
use crate::graph::{KnowledgeGraph, NodeId, NodeType};
use crate::influence::{credits_of, credits_on, target_works};

/// Where a metric stands now and where the trend puts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub current: f64,
    pub predicted: f64,
    pub delta: f64,
}

/// Cumulative per-year counts over the display years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSeries {
    pub years: Vec<i32>,
    pub activity: Vec<usize>,
    pub influence: Vec<usize>,
    pub popularity: Vec<usize>,
}

/// Blend of normalised predicted level and growth, each in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormScores {
    pub activity: f64,
    pub influence: f64,
    pub popularity: f64,
}

impl NormScores {
    fn features(&self) -> Vec<f64> {
        vec![self.activity, self.influence, self.popularity]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistForecast {
    pub name: String,
    pub activity: Projection,
    pub influence: Projection,
    pub popularity: Projection,
    pub series: ArtistSeries,
    pub norm: NormScores,
    /// Cluster label, `1..=cluster_k`.
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilhouettePoint {
    pub k: usize,
    pub score: f64,
    /// Size of the spotlight artist's cluster at this k.
    pub spotlight_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMeta {
    pub max_year: i32,
    pub pred_year: i32,
    pub recent_years: Vec<i32>,
    pub display_years: Vec<i32>,
    pub candidates: usize,
    pub candidates_excl_spotlight: usize,
    pub score_alpha: f64,
    pub cluster_k: usize,
    pub elbow: Vec<ElbowPoint>,
    pub silhouette: Vec<SilhouettePoint>,
    pub silhouette_raw: Vec<SilhouettePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub meta: ForecastMeta,
    pub artists: Vec<ArtistForecast>,
}

#[derive(Default)]
struct YearTally {
    works: BTreeSet<NodeId>,
    notable: BTreeSet<NodeId>,
    collaborators: BTreeSet<NodeId>,
}

/// (year, cumulative activity, cumulative influence, cumulative popularity)
type CumulativeRow = (i32, usize, usize, usize);

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ols(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        cov += dx * (yi - y_mean);
        var += dx * dx;
    }

    let slope = if var < 1e-12 { 0.0 } else { cov / var };
    (slope, y_mean - slope * x_mean)
}

/// Least-squares line through `(years, values)` evaluated at `pred_year`.
///
/// The prediction never drops below the last observed value. Fewer than two
/// points means no growth.
pub fn linear_forecast(years: &[i32], values: &[f64], pred_year: i32) -> Projection {
    let current = values.last().copied().unwrap_or(0.0);
    if years.len() < 2 || values.len() < 2 {
        return Projection {
            current,
            predicted: current,
            delta: 0.0,
        };
    }
    let x: Vec<f64> = years.iter().map(|&y| f64::from(y)).collect();
    let (slope, intercept) = ols(&x, values);
    let predicted = (slope * f64::from(pred_year) + intercept).max(current);
    Projection {
        current,
        predicted,
        delta: (predicted - current).max(0.0),
    }
}

/// Min-max scale to `0..=1`; a flat input maps to all zeros.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Per-artist, per-year tallies keyed by normalised name.
fn tally_candidates(graph: &KnowledgeGraph, target_genre: &str) -> BTreeMap<String, BTreeMap<i32, YearTally>> {
    let targets = target_works(graph, target_genre);
    let candidates: BTreeSet<NodeId> = credits_on(graph, &targets).into_iter().map(|c| c.artist).collect();

    // Person collaborators on every work, not just target-genre ones
    let mut people_on: HashMap<NodeId, BTreeSet<NodeId>> = HashMap::new();
    for r in graph.relationships().iter().filter(|r| r.edge_type.is_creative()) {
        let is_person = graph.entity(r.source).is_some_and(|e| e.node_type == NodeType::Person);
        let is_work = graph.entity(r.target).is_some_and(|e| e.node_type.is_work());
        if is_person && is_work {
            people_on.entry(r.target).or_default().insert(r.source);
        }
    }

    let mut tallies: BTreeMap<String, BTreeMap<i32, YearTally>> = BTreeMap::new();
    for &artist in &candidates {
        let Some(name) = graph.entity(artist).and_then(|e| e.name.as_deref()) else {
            continue;
        };
        let name = normalize_name(name);
        if name.is_empty() {
            continue;
        }
        for credit in credits_of(graph, artist) {
            let Some(year) = graph.work_year(credit.work) else {
                continue;
            };
            let tally = tallies.entry(name.clone()).or_default().entry(year).or_default();
            tally.works.insert(credit.work);
            if graph.entity(credit.work).is_some_and(|w| w.notable) {
                tally.notable.insert(credit.work);
            }
            if let Some(people) = people_on.get(&credit.work) {
                tally
                    .collaborators
                    .extend(people.iter().copied().filter(|&p| p != artist));
            }
        }
    }
    tallies
}

fn cumulative(yearly: &BTreeMap<i32, YearTally>, span: &[i32]) -> Vec<CumulativeRow> {
    let (mut works, mut collabs, mut notable) = (0, 0, 0);
    span.iter()
        .map(|&year| {
            if let Some(t) = yearly.get(&year) {
                works += t.works.len();
                collabs += t.collaborators.len();
                notable += t.notable.len();
            }
            (year, works, collabs, notable)
        })
        .collect()
}

struct ClusterChoice {
    k: usize,
    labels: Vec<usize>,
    elbow: Vec<ElbowPoint>,
    silhouette: Vec<SilhouettePoint>,
    silhouette_raw: Vec<SilhouettePoint>,
}

/// Scale a raw silhouette by how crowded the spotlight artist's cluster is.
///
/// Each extra member costs 1%, capped at 20%; a cluster of one earns a 10% bonus.
fn adjust_silhouette(raw: f64, spotlight_size: Option<usize>) -> f64 {
    let Some(size) = spotlight_size else {
        return raw;
    };
    let penalty = (0.01 * size.saturating_sub(1) as f64).min(0.2);
    let adjusted = raw * (1.0 - penalty);
    if size == 1 { adjusted * 1.1 } else { adjusted }
}

/// Best-scoring k, overridden by the best k at or above `preferred_min_k`
/// whenever one scored above -1.
fn pick_k(adjusted: &[SilhouettePoint], preferred_min_k: usize) -> usize {
    let (mut best_k, mut best_score) = (2, -1.0);
    let mut preferred: Option<(usize, f64)> = None;
    for point in adjusted {
        if point.score > best_score {
            best_score = point.score;
            best_k = point.k;
        }
        if point.k >= preferred_min_k && point.score > preferred.map_or(-1.0, |(_, s)| s) {
            preferred = Some((point.k, point.score));
        }
    }
    // A two-way split around one outlier is rarely informative
    preferred.map_or(best_k, |(k, _)| k)
}

/// Sweep k, score each split by silhouette adjusted for how crowded the
/// spotlight artist's cluster is, and refit the winner.
fn choose_clusters(
    points: &[Vec<f64>],
    spotlight: Option<usize>,
    config: &ForecastConfig,
) -> cluster::Result<ClusterChoice> {
    let n = points.len();
    if n < 3 {
        return Ok(ClusterChoice {
            k: 1,
            labels: vec![0; n],
            elbow: Vec::new(),
            silhouette: Vec::new(),
            silhouette_raw: Vec::new(),
        });
    }

    let max_k = config.max_k.min((n - 1).max(2));
    let mut elbow = Vec::new();
    let mut adjusted_points = Vec::new();
    let mut raw_points = Vec::new();

    for k in 2..=max_k {
        let fit = kmeans(points, k, config.n_init, config.max_iter, config.seed)?;
        elbow.push(ElbowPoint { k, inertia: fit.inertia });

        let raw = silhouette(points, &fit.labels).unwrap_or(-1.0);
        let spotlight_size = spotlight.map(|i| {
            let own = fit.labels[i];
            fit.labels.iter().filter(|&&l| l == own).count()
        });
        let adjusted = adjust_silhouette(raw, spotlight_size);
        log::debug!("k={k}: inertia {:.4}, silhouette {raw:.4} (adjusted {adjusted:.4})", fit.inertia);

        raw_points.push(SilhouettePoint {
            k,
            score: raw,
            spotlight_size,
        });
        adjusted_points.push(SilhouettePoint {
            k,
            score: adjusted,
            spotlight_size,
        });
    }

    let best_k = pick_k(&adjusted_points, config.preferred_min_k);
    let fit = kmeans(points, best_k, config.final_n_init, config.max_iter, config.seed)?;
    Ok(ClusterChoice {
        k: best_k,
        labels: fit.labels,
        elbow,
        silhouette: adjusted_points,
        silhouette_raw: raw_points,
    })
}

/// Forecast every artist credited on a target-genre work and cluster them.
pub fn build_forecast(
    graph: &KnowledgeGraph,
    analysis: &AnalysisConfig,
    config: &ForecastConfig,
) -> Result<ForecastPayload> {
    let tallies = tally_candidates(graph, &analysis.target_genre);
    let all_years: BTreeSet<i32> = tallies.values().flat_map(|y| y.keys().copied()).collect();
    let (Some(&min_year), Some(&max_year)) = (all_years.first(), all_years.last()) else {
        bail!("No {} artist data found", analysis.target_genre);
    };

    let pred_year = max_year + config.years_ahead;
    let span: Vec<i32> = (min_year..=max_year).collect();
    let recent_years: Vec<i32> = if config.recent_window > 0 {
        (max_year - (config.recent_window - 1)..=max_year).collect()
    } else {
        span.clone()
    };

    let mut artists: Vec<ArtistForecast> = tallies
        .iter()
        .map(|(name, yearly)| {
            let rows = cumulative(yearly, &span);
            let mut window: Vec<&CumulativeRow> = rows.iter().filter(|r| recent_years.contains(&r.0)).collect();
            if window.len() < 2 {
                window = rows.iter().skip(rows.len().saturating_sub(config.fallback_points)).collect();
            }
            let years: Vec<i32> = window.iter().map(|r| r.0).collect();
            let project = |pick: fn(&CumulativeRow) -> usize| {
                let values: Vec<f64> = window.iter().map(|r| pick(r) as f64).collect();
                linear_forecast(&years, &values, pred_year)
            };

            ArtistForecast {
                name: name.clone(),
                activity: project(|r| r.1),
                influence: project(|r| r.2),
                popularity: project(|r| r.3),
                series: ArtistSeries {
                    years: span.clone(),
                    activity: rows.iter().map(|r| r.1).collect(),
                    influence: rows.iter().map(|r| r.2).collect(),
                    popularity: rows.iter().map(|r| r.3).collect(),
                },
                norm: NormScores {
                    activity: 0.0,
                    influence: 0.0,
                    popularity: 0.0,
                },
                cluster: 1,
            }
        })
        .collect();

    let alpha = config.score_alpha;
    let blend = |pick: fn(&ArtistForecast) -> Projection| -> Vec<f64> {
        let predicted = min_max(&artists.iter().map(|a| pick(a).predicted).collect::<Vec<_>>());
        let delta = min_max(&artists.iter().map(|a| pick(a).delta).collect::<Vec<_>>());
        predicted
            .iter()
            .zip(&delta)
            .map(|(p, d)| alpha * p + (1.0 - alpha) * d)
            .collect()
    };
    let activity = blend(|a| a.activity);
    let influence = blend(|a| a.influence);
    let popularity = blend(|a| a.popularity);
    for (i, artist) in artists.iter_mut().enumerate() {
        artist.norm = NormScores {
            activity: activity[i],
            influence: influence[i],
            popularity: popularity[i],
        };
    }

    let spotlight_name = normalize_name(&analysis.spotlight_artist);
    let spotlight = artists.iter().position(|a| a.name == spotlight_name);
    let points: Vec<Vec<f64>> = artists.iter().map(|a| a.norm.features()).collect();
    let choice = choose_clusters(&points, spotlight, config)?;
    for (artist, label) in artists.iter_mut().zip(&choice.labels) {
        artist.cluster = label + 1;
    }

    let candidates = artists.len();
    log::info!(
        "{candidates} candidate artists, forecasting {pred_year}, {} clusters",
        choice.k
    );

    Ok(ForecastPayload {
        meta: ForecastMeta {
            max_year,
            pred_year,
            recent_years,
            display_years: span,
            candidates,
            candidates_excl_spotlight: candidates - usize::from(spotlight.is_some()),
            score_alpha: alpha,
            cluster_k: choice.k,
            elbow: choice.elbow,
            silhouette: choice.silhouette,
            silhouette_raw: choice.silhouette_raw,
        },
        artists,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeType;
    use crate::testutil::{GraphBuilder, scene};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn scene_forecast() -> ForecastPayload {
        build_forecast(&scene(), &AnalysisConfig::default(), &ForecastConfig::default()).unwrap()
    }

    /// Six artists with different output so the cluster sweep has room to work.
    fn crowd() -> KnowledgeGraph {
        let names = [
            "Ash Harbor",
            "Brine Choir",
            "Cove Static",
            "Drift Lantern",
            "Eddy Bloom",
            "Sailor Shift",
        ];
        let mut builder = GraphBuilder::new();
        let mut work: NodeId = 100;
        for (i, name) in names.iter().enumerate() {
            let artist = i as NodeId + 1;
            builder = builder.person(artist, name);
            for j in 0..=i {
                let year = 2016 + ((j * (i + 1)) % 9) as i32;
                builder = if (i + j) % 3 == 0 {
                    builder.notable_song(work, "Track", "Oceanus Folk", year)
                } else {
                    builder.song(work, "Track", "Oceanus Folk", year)
                };
                builder = builder.edge(artist, EdgeType::PerformerOf, work);
                work += 1;
            }
        }
        builder
            .song(200, "Duet", "Oceanus Folk", 2024)
            .edge(5, EdgeType::PerformerOf, 200)
            .edge(6, EdgeType::ComposerOf, 200)
            .build()
    }

    #[test]
    fn test_linear_forecast_rising() {
        let p = linear_forecast(&[2020, 2021, 2022], &[1.0, 2.0, 3.0], 2025);
        assert!(close(p.predicted, 6.0));
        assert!(close(p.current, 3.0));
        assert!(close(p.delta, 3.0));
    }

    #[test]
    fn test_linear_forecast_floors_at_last_value() {
        let p = linear_forecast(&[2020, 2021, 2022], &[5.0, 4.0, 3.0], 2025);
        assert_eq!(p.predicted, 3.0);
        assert_eq!(p.delta, 0.0);
    }

    #[test]
    fn test_linear_forecast_single_point() {
        let p = linear_forecast(&[2020], &[4.0], 2025);
        assert_eq!(p, Projection { current: 4.0, predicted: 4.0, delta: 0.0 });
        let empty = linear_forecast(&[], &[], 2025);
        assert_eq!(empty.predicted, 0.0);
    }

    #[test]
    fn test_min_max_flat_is_zero() {
        assert_eq!(min_max(&[2.0, 2.0, 2.0]), vec![0.0; 3]);
        assert_eq!(min_max(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_candidates_and_meta() {
        let payload = scene_forecast();
        let names: Vec<&str> = payload.artists.iter().map(|a| a.name.as_str()).collect();
        // Kai Rowan and the group never credit an Oceanus Folk work
        assert_eq!(names, vec!["Ivy Echoes", "Sailor Shift"]);
        let meta = &payload.meta;
        assert_eq!((meta.max_year, meta.pred_year), (2026, 2031));
        assert_eq!(meta.recent_years, (2020..=2026).collect::<Vec<_>>());
        assert_eq!(meta.display_years, meta.recent_years);
        assert_eq!((meta.candidates, meta.candidates_excl_spotlight), (2, 1));
        // Too few candidates to cluster
        assert_eq!(meta.cluster_k, 1);
        assert!(meta.elbow.is_empty());
        assert!(payload.artists.iter().all(|a| a.cluster == 1));
    }

    #[test]
    fn test_cumulative_series() {
        let payload = scene_forecast();
        let sailor = &payload.artists[1];
        assert_eq!(sailor.series.activity, vec![1, 1, 1, 1, 2, 2, 3]);
        // Ivy on Tidal Hymn, then Kai on Neon Undertow
        assert_eq!(sailor.series.influence, vec![1, 1, 1, 1, 1, 1, 2]);
        assert_eq!(sailor.series.popularity, vec![1, 1, 1, 1, 2, 2, 2]);

        let ivy = &payload.artists[0];
        assert_eq!(ivy.series.activity, vec![1, 1, 2, 2, 2, 2, 2]);
        assert_eq!(ivy.series.popularity, vec![1; 7]);
    }

    #[test]
    fn test_projections_and_norm() {
        let payload = scene_forecast();
        let (ivy, sailor) = (&payload.artists[0], &payload.artists[1]);

        assert!(close(sailor.activity.predicted, 29.0 / 7.0));
        assert!(close(sailor.activity.delta, 8.0 / 7.0));
        assert!(close(ivy.activity.predicted, 22.0 / 7.0));
        assert!(close(sailor.popularity.predicted, 22.0 / 7.0));
        assert!(close(ivy.popularity.predicted, 1.0));
        assert!(close(ivy.popularity.delta, 0.0));

        assert!(sailor.norm.activity > ivy.norm.activity);
        assert!(close(sailor.norm.popularity, 1.0));
        assert!(close(ivy.norm.popularity, 0.0));
    }

    #[test]
    fn test_names_merged_after_whitespace_normalisation() {
        let graph = GraphBuilder::new()
            .person(1, "Kai  Rowan")
            .person(2, " Kai Rowan")
            .song(10, "One", "Oceanus Folk", 2020)
            .song(11, "Two", "Oceanus Folk", 2021)
            .edge(1, EdgeType::PerformerOf, 10)
            .edge(2, EdgeType::PerformerOf, 11)
            .build();
        let payload = build_forecast(&graph, &AnalysisConfig::default(), &ForecastConfig::default()).unwrap();
        assert_eq!(payload.artists.len(), 1);
        assert_eq!(payload.artists[0].name, "Kai Rowan");
        assert_eq!(payload.artists[0].series.activity, vec![1, 2]);
        assert_eq!(payload.meta.candidates_excl_spotlight, 1);
    }

    #[test]
    fn test_cluster_sweep() {
        let payload = build_forecast(&crowd(), &AnalysisConfig::default(), &ForecastConfig::default()).unwrap();
        let meta = &payload.meta;
        let ks: Vec<usize> = meta.elbow.iter().map(|p| p.k).collect();
        assert_eq!(ks, vec![2, 3, 4, 5]);
        assert_eq!(meta.silhouette.len(), 4);
        assert_eq!(meta.silhouette_raw.len(), 4);
        assert!(meta.silhouette.iter().all(|p| p.spotlight_size.is_some()));
        assert!((3..=5).contains(&meta.cluster_k));
        assert!(
            payload
                .artists
                .iter()
                .all(|a| (1..=meta.cluster_k).contains(&a.cluster))
        );
        assert_eq!(meta.candidates_excl_spotlight, 5);
        for (adjusted, raw) in meta.silhouette.iter().zip(&meta.silhouette_raw) {
            assert_eq!(adjusted.k, raw.k);
            assert!(close(adjusted.score, adjust_silhouette(raw.score, raw.spotlight_size)));
        }
    }

    #[test]
    fn test_adjust_silhouette() {
        assert!(close(adjust_silhouette(0.5, None), 0.5));
        assert!(close(adjust_silhouette(0.5, Some(1)), 0.55));
        assert!(close(adjust_silhouette(0.5, Some(5)), 0.48));
        // penalty stops at 20%
        assert!(close(adjust_silhouette(0.5, Some(30)), 0.4));
        assert!(close(adjust_silhouette(0.5, Some(21)), 0.4));
        assert!(close(adjust_silhouette(-1.0, Some(3)), -0.98));
    }

    fn points(scores: &[(usize, f64)]) -> Vec<SilhouettePoint> {
        scores
            .iter()
            .map(|&(k, score)| SilhouettePoint {
                k,
                score,
                spotlight_size: None,
            })
            .collect()
    }

    #[test]
    fn test_pick_k_prefers_larger_splits() {
        // k=2 scores best overall but a k>=3 split is preferred
        assert_eq!(pick_k(&points(&[(2, 0.9), (3, 0.4), (4, 0.6), (5, 0.5)]), 3), 4);
        // nothing at or above the preferred minimum beat -1
        assert_eq!(pick_k(&points(&[(2, 0.3), (3, -1.0), (4, -1.0)]), 3), 2);
        assert_eq!(pick_k(&points(&[(2, 0.1), (3, 0.7)]), 2), 3);
        assert_eq!(pick_k(&[], 3), 2);
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let analysis = AnalysisConfig::default();
        let config = ForecastConfig::default();
        let a = serde_json::to_string(&build_forecast(&crowd(), &analysis, &config).unwrap()).unwrap();
        let b = serde_json::to_string(&build_forecast(&crowd(), &analysis, &config).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let graph = GraphBuilder::new()
            .person(1, "Sailor Shift")
            .song(2, "Elsewhere", "Synthwave", 2019)
            .edge(1, EdgeType::PerformerOf, 2)
            .build();
        assert!(build_forecast(&graph, &AnalysisConfig::default(), &ForecastConfig::default()).is_err());
    }
}
