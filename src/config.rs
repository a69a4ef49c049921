use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::genres::CustomGenreConfig;
use crate::graph::EdgeType;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Knowledge graph JSON (used when `--graph` is not given).
    pub graph_path: Option<PathBuf>,
    /// Directory chart files are written to (used when `--out-dir` is not given).
    pub out_dir: Option<PathBuf>,
    pub analysis: AnalysisConfig,
    pub scoring: ScoringConfig,
    pub forecast: ForecastConfig,
    /// Extra subgenre → family mappings (merged with the built-in table).
    #[serde(rename = "genres")]
    pub custom_genres: Vec<CustomGenreConfig>,
}

/// Which slice of the graph the analyses look at.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Genre whose influence is traced (matched case-insensitively).
    pub target_genre: String,
    /// Artist tracked against the target genre.
    pub spotlight_artist: String,
    /// Minimum contributions for an artist to appear in the network chart.
    pub min_artist_credits: usize,
    /// Inclusive year window summarised as the "pulse" KPI.
    pub pulse_start: i32,
    pub pulse_end: i32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_genre: "Oceanus Folk".to_string(),
            spotlight_artist: "Sailor Shift".to_string(),
            min_artist_credits: 3,
            pulse_start: 2025,
            pulse_end: 2031,
        }
    }
}

/// Weights for the per-entity score builder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight per influence edge type (keyed by edge type name).
    pub relationship_weights: BTreeMap<String, f64>,
    /// Weight per creative edge type (keyed by edge type name).
    pub role_weights: BTreeMap<String, f64>,
    /// Half-life of the time decay in years. 0 disables decay.
    pub half_life_years: f64,
    /// Year decay is measured from. Defaults to the latest release year in the graph.
    pub reference_year: Option<i32>,
    /// Weight of each notable work in the popularity score.
    pub notable_weight: f64,
    /// Score given to entities with no qualifying relationships.
    pub floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let relationship_weights = [
            ("DirectlySamples", 1.0),
            ("CoverOf", 1.0),
            ("InterpolatesFrom", 0.8),
            ("LyricalReferenceTo", 0.6),
            ("InStyleOf", 0.5),
        ];
        let role_weights = [
            ("PerformerOf", 1.0),
            ("ComposerOf", 0.8),
            ("ProducerOf", 0.6),
            ("LyricistOf", 0.6),
        ];
        Self {
            relationship_weights: relationship_weights
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            role_weights: role_weights
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            half_life_years: 10.0,
            reference_year: None,
            notable_weight: 1.0,
            floor: 0.0,
        }
    }
}

impl ScoringConfig {
    /// Weight of an influence edge. Unlisted influence types weigh 1, anything else 0.
    pub fn relationship_weight(&self, edge: &EdgeType) -> f64 {
        if !edge.is_influence() {
            return 0.0;
        }
        self.relationship_weights
            .get(edge.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    /// Weight of a creative credit. Unlisted creative types weigh 1, anything else 0.
    pub fn role_weight(&self, edge: &EdgeType) -> f64 {
        if !edge.is_creative() {
            return 0.0;
        }
        self.role_weights.get(edge.as_str()).copied().unwrap_or(1.0)
    }

    /// Exponential decay factor for an event in `year`, relative to `reference`.
    /// Undated events and a zero half-life give 1.0; future years never exceed 1.0.
    pub fn decay(&self, year: Option<i32>, reference: i32) -> f64 {
        match year {
            Some(y) if self.half_life_years > 0.0 => {
                let age = f64::from((reference - y).max(0));
                0.5_f64.powf(age / self.half_life_years)
            }
            _ => 1.0,
        }
    }
}

/// Parameters of the star forecast and its clustering step.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Years past the last observed year to predict.
    pub years_ahead: i32,
    /// Trailing years used for the regression. 0 uses the full span.
    pub recent_window: i32,
    /// Points used when the recent window holds fewer than two.
    pub fallback_points: usize,
    /// Weight of the predicted level vs. the predicted growth.
    pub score_alpha: f64,
    /// Seed for k-means initialisation.
    pub seed: u64,
    /// Largest k tried in the cluster sweep.
    pub max_k: usize,
    /// Restarts per k in the sweep.
    pub n_init: usize,
    /// Restarts for the final fit.
    pub final_n_init: usize,
    /// Sweep winner is taken from k >= this when any such k exists.
    pub preferred_min_k: usize,
    /// Lloyd iterations per restart.
    pub max_iter: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            years_ahead: 5,
            recent_window: 7,
            fallback_points: 5,
            score_alpha: 0.7,
            seed: 42,
            max_k: 8,
            n_init: 10,
            final_n_init: 20,
            preferred_min_k: 3,
            max_iter: 300,
        }
    }
}

impl AppConfig {
    /// Load config from `explicit` if given, else `~/.config/oceanus/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load(explicit: Option<&Path>) -> Self {
        let config_path = explicit.map(Path::to_path_buf).or_else(Self::config_path);
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Some(path) if explicit.is_some() => {
                log::warn!("Config file {} not found. Using defaults.", path.display());
                Self::default()
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Graph file looked for when neither CLI nor config names one.
pub fn default_graph_path() -> PathBuf {
    PathBuf::from(crate::DEFAULT_GRAPH_FILE)
}

/// Output directory used when neither CLI nor config names one.
pub fn default_out_dir() -> PathBuf {
    PathBuf::from(crate::DEFAULT_OUT_DIR)
}
