use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, Category};
use crate::graph::NodeId;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;

/// A named value array over the chart's category axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// One slot per category; `null` where the series has no value.
    pub data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Integer counts over a shared axis (years, usually).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSeries {
    pub name: String,
    pub data: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Category-axis chart: labels plus one or more series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

/// A (series, category, value) triple.
pub type ChartPoint = (String, String, f64);

/// Category label per ranked slot, in aggregate order.
///
/// A name shared by different entities carries the entity key, `"Name (#12)"`.
fn category_labels(aggregates: &[Aggregate]) -> Vec<String> {
    let mut owners: HashMap<&str, BTreeSet<NodeId>> = HashMap::new();
    for r in aggregates.iter().flat_map(|a| &a.ranking) {
        owners.entry(r.name.as_str()).or_default().insert(r.entity);
    }
    aggregates
        .iter()
        .flat_map(|a| &a.ranking)
        .map(|r| {
            if owners.get(r.name.as_str()).is_some_and(|ids| ids.len() > 1) {
                format!("{} (#{})", r.name, r.entity)
            } else {
                r.name.clone()
            }
        })
        .collect()
}

impl ChartConfig {
    /// One category per ranked entity, one series per aggregate group.
    pub fn from_aggregates(title: &str, aggregates: &[Aggregate]) -> Self {
        let categories = category_labels(aggregates);

        let mut offset = 0;
        let series = aggregates
            .iter()
            .map(|a| {
                let mut data = vec![None; categories.len()];
                for (i, record) in a.ranking.iter().enumerate() {
                    data[offset + i] = Some(record.value);
                }
                offset += a.ranking.len();
                Series {
                    name: a.label.clone(),
                    data,
                    color: match a.category {
                        Category::Family(f) => Some(f.color().to_string()),
                        _ => None,
                    },
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            categories,
            series,
        }
    }

    /// Every non-empty slot as a (series, category, value) triple, series by series.
    pub fn pairs(&self) -> Vec<ChartPoint> {
        self.series
            .iter()
            .flat_map(|s| {
                s.data.iter().enumerate().filter_map(move |(i, v)| {
                    let value = (*v)?;
                    let category = self.categories.get(i)?;
                    Some((s.name.clone(), category.clone(), value))
                })
            })
            .collect()
    }
}

/// The triples a chart built from `aggregates` should contain.
pub fn aggregate_pairs(aggregates: &[Aggregate]) -> Vec<ChartPoint> {
    aggregates
        .iter()
        .flat_map(|a| a.ranking.iter().map(move |r| (a, r)))
        .zip(category_labels(aggregates))
        .map(|((a, r), category)| (a.label.clone(), category, r.value))
        .collect()
}

/// Serialize `value` as compact JSON to `path`, creating the parent directory.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| ChartError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).map_err(io_err)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|source| ChartError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Reload a chart written by [`write_json`].
pub fn read_chart(path: &Path) -> Result<ChartConfig> {
    read_json(path)
}
