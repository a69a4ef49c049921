//! Collaboration network around the works the target genre influenced:
//! who performed, composed, produced, or wrote them, and in which families.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::genres::{Family, GenreMap, NEUTRAL_COLOR, lighten};
use crate::graph::{KnowledgeGraph, NodeId};
use crate::influence::{credits_on, influenced_links, target_works};

const ROOT_COLOR: &str = "#111827";
const TOP_WORKS: usize = 5;
const TOP_FAMILY_ARTISTS: usize = 3;

/// One artist's credit on one influenced work.
#[derive(Debug, Clone, PartialEq)]
struct Contribution {
    artist: String,
    title: String,
    genre: String,
    family: Family,
    role: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub title: String,
    pub genre: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRoles {
    pub id: String,
    pub roles: Vec<RoleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    pub id: String,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionLink {
    pub source: String,
    pub target: String,
    pub role: String,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub artist: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyWork {
    pub title: String,
    pub contributors: Vec<Contributor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyGenre {
    pub genre: String,
    pub works: Vec<HierarchyWork>,
}

/// Flat tables of every contribution, for the drill-down views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionsPayload {
    pub artists: Vec<ArtistRoles>,
    pub works: Vec<WorkEntry>,
    pub links: Vec<ContributionLink>,
    pub hierarchy: Vec<HierarchyGenre>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    pub id: String,
    pub name: String,
    /// 0 = root, 1 = family, 2 = artist
    pub category: u8,
    pub symbol: String,
    pub symbol_size: f64,
    pub value: usize,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    pub show_label: bool,
    pub tooltip: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    pub value: usize,
    pub color: String,
    pub opacity: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkKpis {
    pub works: usize,
    pub artists: usize,
    pub top_genre: String,
    pub top_artist: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPayload {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
    pub artist_ranking: Vec<ArtistCount>,
    pub artist_totals: BTreeMap<String, usize>,
    pub artist_genre_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub artist_details: BTreeMap<String, Vec<RoleEntry>>,
    pub kpis: NetworkKpis,
}

/// Both exports of the network analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReport {
    pub contributions: ContributionsPayload,
    pub network: NetworkPayload,
}

fn round_to(x: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (x * scale).round() / scale
}

/// Sort `(label, count)` pairs by count descending, then label.
fn by_count_desc<K: Ord>(counts: impl IntoIterator<Item = (K, usize)>) -> Vec<(K, usize)> {
    let mut v: Vec<(K, usize)> = counts.into_iter().collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

fn collect_contributions(
    graph: &KnowledgeGraph,
    genres: &GenreMap,
    influenced: &BTreeSet<NodeId>,
) -> Vec<Contribution> {
    credits_on(graph, influenced)
        .into_iter()
        .filter_map(|credit| {
            let artist = graph.entity(credit.artist)?;
            let work = graph.entity(credit.work)?;
            Some(Contribution {
                artist: artist.display_name().to_string(),
                title: work.display_name().to_string(),
                genre: work.genre().unwrap_or("Unknown").to_string(),
                family: genres.family(work.genre()),
                role: credit.role(),
            })
        })
        .collect()
}

fn contributions_payload(
    graph: &KnowledgeGraph,
    influenced: &BTreeSet<NodeId>,
    contributions: &[Contribution],
) -> ContributionsPayload {
    let mut roles_by_artist: BTreeMap<&str, Vec<RoleEntry>> = BTreeMap::new();
    let mut hierarchy: BTreeMap<&str, BTreeMap<&str, Vec<Contributor>>> = BTreeMap::new();
    for c in contributions {
        roles_by_artist.entry(&c.artist).or_default().push(RoleEntry {
            title: c.title.clone(),
            genre: c.genre.clone(),
            role: c.role.to_string(),
        });
        hierarchy
            .entry(&c.genre)
            .or_default()
            .entry(&c.title)
            .or_default()
            .push(Contributor {
                artist: c.artist.clone(),
                role: c.role.to_string(),
            });
    }

    let mut works: Vec<WorkEntry> = influenced
        .iter()
        .filter_map(|&id| graph.entity(id))
        .map(|w| WorkEntry {
            id: w.display_name().to_string(),
            genre: w.genre().unwrap_or("Unknown").to_string(),
        })
        .collect();
    works.sort_by(|a, b| a.id.cmp(&b.id));

    ContributionsPayload {
        artists: roles_by_artist
            .into_iter()
            .map(|(artist, roles)| ArtistRoles {
                id: artist.to_string(),
                roles,
            })
            .collect(),
        works,
        links: contributions
            .iter()
            .map(|c| ContributionLink {
                source: c.artist.clone(),
                target: c.title.clone(),
                role: c.role.to_string(),
                genre: c.genre.clone(),
            })
            .collect(),
        hierarchy: hierarchy
            .into_iter()
            .map(|(genre, works)| HierarchyGenre {
                genre: genre.to_string(),
                works: works
                    .into_iter()
                    .map(|(title, contributors)| HierarchyWork {
                        title: title.to_string(),
                        contributors,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Build the contribution tables and the family/artist network.
pub fn build_network(
    graph: &KnowledgeGraph,
    genres: &GenreMap,
    analysis: &AnalysisConfig,
) -> NetworkReport {
    let targets = target_works(graph, &analysis.target_genre);
    let influenced: BTreeSet<NodeId> = influenced_links(graph, &targets)
        .into_iter()
        .map(|l| l.source)
        .collect();
    let contributions = collect_contributions(graph, genres, &influenced);
    log::info!(
        "{} influenced works, {} contributions",
        influenced.len(),
        contributions.len()
    );

    let contributions_table = contributions_payload(graph, &influenced, &contributions);

    let mut artist_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in &contributions {
        *artist_counts.entry(&c.artist).or_insert(0) += 1;
    }
    let featured: BTreeSet<&str> = artist_counts
        .iter()
        .filter(|&(_, &n)| n >= analysis.min_artist_credits)
        .map(|(&a, _)| a)
        .collect();

    let mut family_counts: BTreeMap<&str, BTreeMap<Family, usize>> = BTreeMap::new();
    let mut role_counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut work_counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    let mut details: BTreeMap<String, Vec<RoleEntry>> = BTreeMap::new();
    for c in contributions.iter().filter(|c| featured.contains(c.artist.as_str())) {
        *family_counts.entry(&c.artist).or_default().entry(c.family).or_insert(0) += 1;
        *role_counts.entry(&c.artist).or_default().entry(c.role).or_insert(0) += 1;
        *work_counts.entry(&c.artist).or_default().entry(&c.title).or_insert(0) += 1;
        details.entry(c.artist.clone()).or_default().push(RoleEntry {
            title: c.title.clone(),
            genre: c.genre.clone(),
            role: c.role.to_string(),
        });
    }
    for entries in details.values_mut() {
        entries.sort_by(|a, b| {
            (&a.genre, &a.title, &a.role).cmp(&(&b.genre, &b.title, &b.role))
        });
    }

    // Distinct influenced titles per family
    let mut family_titles: BTreeMap<Family, BTreeSet<&str>> = BTreeMap::new();
    for &id in &influenced {
        if let Some(work) = graph.entity(id) {
            family_titles
                .entry(genres.family(work.genre()))
                .or_default()
                .insert(work.display_name());
        }
    }

    let mut links = Vec::new();
    for (&family, titles) in &family_titles {
        let n = titles.len();
        links.push(NetworkLink {
            source: analysis.target_genre.clone(),
            target: family.name().to_string(),
            value: n,
            color: ROOT_COLOR.to_string(),
            opacity: 0.5,
            width: round_to(1.0 + n as f64 / 6.0, 2),
        });
    }
    for (&artist, by_family) in &family_counts {
        for (&family, &n) in by_family {
            links.push(NetworkLink {
                source: family.name().to_string(),
                target: artist.to_string(),
                value: n,
                color: family.color().to_string(),
                opacity: 0.45,
                width: round_to(1.0 + n as f64 * 0.7, 2),
            });
        }
    }

    let max_artist = featured
        .iter()
        .map(|a| artist_counts[a])
        .max()
        .unwrap_or(1);
    let max_family = family_titles.values().map(BTreeSet::len).max().unwrap_or(1);

    let mut nodes = vec![NetworkNode {
        id: analysis.target_genre.clone(),
        name: analysis.target_genre.clone(),
        category: 0,
        symbol: "roundRect".to_string(),
        symbol_size: 44.0,
        value: family_titles.values().map(BTreeSet::len).sum(),
        color: ROOT_COLOR.to_string(),
        border_color: None,
        show_label: true,
        tooltip: vec![
            analysis.target_genre.clone(),
            "Reference source for influence".to_string(),
        ],
    }];

    for (&family, titles) in &family_titles {
        let n = titles.len();
        let top_artists = by_count_desc(
            family_counts
                .iter()
                .filter_map(|(&artist, by_family)| by_family.get(&family).map(|&c| (artist, c))),
        );
        let mut tooltip = vec![family.name().to_string(), format!("Influenced works: {n}")];
        if !top_artists.is_empty() {
            tooltip.push("Top artists".to_string());
            for (artist, c) in top_artists.into_iter().take(TOP_FAMILY_ARTISTS) {
                tooltip.push(format!("• {artist} ({c})"));
            }
        }
        nodes.push(NetworkNode {
            id: family.name().to_string(),
            name: family.name().to_string(),
            category: 1,
            symbol: "diamond".to_string(),
            symbol_size: round_to(24.0 + (n as f64 / max_family as f64).powf(1.2) * 32.0, 1),
            value: n,
            color: family.color().to_string(),
            border_color: None,
            show_label: true,
            tooltip,
        });
    }

    for &artist in &featured {
        let total = artist_counts[artist];
        let by_family = family_counts.get(artist).cloned().unwrap_or_default();
        let top_family = by_family
            .iter()
            .fold(None, |best: Option<(Family, usize)>, (&f, &n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((f, n)),
            })
            .map(|(f, _)| f);
        let base = top_family.map_or(NEUTRAL_COLOR, Family::color);

        let mut tooltip = vec![artist.to_string(), format!("Total roles: {total}")];
        if !by_family.is_empty() {
            tooltip.push("Genres".to_string());
            for (f, n) in by_count_desc(by_family.iter().map(|(&f, &n)| (f.name(), n))) {
                tooltip.push(format!("• {f}: {n}"));
            }
        }
        if let Some(roles) = role_counts.get(artist) {
            tooltip.push("Roles".to_string());
            for (role, n) in by_count_desc(roles.iter().map(|(&r, &n)| (r, n))) {
                tooltip.push(format!("• {role}: {n}"));
            }
        }
        if let Some(works) = work_counts.get(artist) {
            tooltip.push("Top works".to_string());
            for (title, n) in by_count_desc(works.iter().map(|(&t, &n)| (t, n)))
                .into_iter()
                .take(TOP_WORKS)
            {
                tooltip.push(format!("• {title} ({n})"));
            }
        }

        nodes.push(NetworkNode {
            id: artist.to_string(),
            name: artist.to_string(),
            category: 2,
            symbol: "circle".to_string(),
            symbol_size: round_to(12.0 + (total as f64 / max_artist as f64).powf(1.3) * 30.0, 1),
            value: total,
            color: lighten(base, 0.5),
            border_color: Some(base.to_string()),
            show_label: total >= 4,
            tooltip,
        });
    }

    let artist_ranking: Vec<ArtistCount> =
        by_count_desc(featured.iter().map(|&a| (a, artist_counts[a])))
            .into_iter()
            .map(|(name, count)| ArtistCount {
                name: name.to_string(),
                count,
            })
            .collect();

    let top_genre = family_titles
        .iter()
        .fold(None, |best: Option<(Family, usize)>, (&f, titles)| match best {
            Some((_, best_n)) if best_n >= titles.len() => best,
            _ => Some((f, titles.len())),
        })
        .map_or_else(|| "—".to_string(), |(f, n)| format!("{f} ({n})"));
    let top_artist = artist_ranking
        .first()
        .map_or_else(|| "—".to_string(), |a| format!("{} ({})", a.name, a.count));

    let network = NetworkPayload {
        nodes,
        links,
        artist_totals: featured
            .iter()
            .map(|&a| (a.to_string(), artist_counts[a]))
            .collect(),
        artist_genre_counts: family_counts
            .iter()
            .map(|(&a, by_family)| {
                (
                    a.to_string(),
                    by_family.iter().map(|(f, &n)| (f.name().to_string(), n)).collect(),
                )
            })
            .collect(),
        artist_details: details,
        kpis: NetworkKpis {
            works: contributions_table.works.len(),
            artists: featured.len(),
            top_genre,
            top_artist,
        },
        artist_ranking,
    };

    NetworkReport {
        contributions: contributions_table,
        network,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scene;

    fn report() -> NetworkReport {
        build_network(&scene(), &GenreMap::default(), &AnalysisConfig::default())
    }

    #[test]
    fn test_contribution_tables() {
        let c = report().contributions;
        let artists: Vec<&str> = c.artists.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(artists, vec!["Kai Rowan", "Sailor Shift", "The Tide Callers"]);
        assert_eq!(c.artists[0].roles.len(), 4);

        let works: Vec<&str> = c.works.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(works, vec!["Iron Gale", "Neon Undertow", "Static Bloom"]);
        assert_eq!(c.works[2].genre, "Unknown");

        assert_eq!(c.links.len(), 6);
        assert_eq!(c.links[0].source, "Kai Rowan");
        assert_eq!(c.links[0].role, "Producer");

        let genres: Vec<&str> = c.hierarchy.iter().map(|h| h.genre.as_str()).collect();
        assert_eq!(genres, vec!["Doom Metal", "Synthwave", "Unknown"]);
        assert_eq!(c.hierarchy[1].works[0].contributors.len(), 3);
    }

    #[test]
    fn test_only_prolific_artists_are_featured() {
        let n = report().network;
        assert_eq!(n.artist_ranking, vec![ArtistCount { name: "Kai Rowan".into(), count: 4 }]);
        assert_eq!(n.artist_totals.len(), 1);
        let kai = &n.artist_genre_counts["Kai Rowan"];
        assert_eq!(kai["Electronic"], 2);
        assert_eq!(kai["Metal"], 1);
        assert_eq!(kai["Rock"], 1);
        assert_eq!(n.artist_details["Kai Rowan"][0].genre, "Doom Metal");
    }

    #[test]
    fn test_nodes_and_links() {
        let n = report().network;
        let ids: Vec<&str> = n.nodes.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, vec!["Oceanus Folk", "Rock", "Metal", "Electronic", "Kai Rowan"]);
        assert_eq!(n.nodes[0].value, 3);
        assert_eq!(n.nodes[1].symbol_size, 56.0);

        let kai = &n.nodes[4];
        assert_eq!(kai.symbol_size, 42.0);
        assert!(kai.show_label);
        assert_eq!(kai.border_color.as_deref(), Some(Family::Electronic.color()));
        assert_eq!(kai.color, lighten(Family::Electronic.color(), 0.5));
        assert_eq!(kai.tooltip[0], "Kai Rowan");
        assert_eq!(kai.tooltip[3], "• Electronic: 2");

        assert_eq!(n.links.len(), 6);
        assert_eq!(n.links[0].width, 1.17);
        let to_electronic = n
            .links
            .iter()
            .find(|l| l.source == "Electronic" && l.target == "Kai Rowan")
            .unwrap();
        assert_eq!(to_electronic.value, 2);
        assert_eq!(to_electronic.width, 2.4);
    }

    #[test]
    fn test_family_tooltip_lists_top_artists() {
        let n = report().network;
        let electronic = n.nodes.iter().find(|x| x.id == "Electronic").unwrap();
        assert_eq!(
            electronic.tooltip,
            vec!["Electronic", "Influenced works: 1", "Top artists", "• Kai Rowan (2)"]
        );
    }

    #[test]
    fn test_kpis() {
        let kpis = report().network.kpis;
        assert_eq!(kpis.works, 3);
        assert_eq!(kpis.artists, 1);
        assert_eq!(kpis.top_genre, "Rock (1)");
        assert_eq!(kpis.top_artist, "Kai Rowan (4)");
    }

    #[test]
    fn test_threshold_from_config() {
        let analysis = AnalysisConfig {
            min_artist_credits: 1,
            ..AnalysisConfig::default()
        };
        let n = build_network(&scene(), &GenreMap::default(), &analysis).network;
        let names: Vec<&str> = n.artist_ranking.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Kai Rowan", "Sailor Shift", "The Tide Callers"]);
        // Small artists keep their labels hidden
        let sailor = n.nodes.iter().find(|x| x.id == "Sailor Shift").unwrap();
        assert!(!sailor.show_label);
    }
}
