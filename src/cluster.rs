//! Seeded k-means and the silhouette coefficient used to pick k, on linfa.

use std::cmp::Ordering;

use linfa::metrics::SilhouetteScore;
use linfa::prelude::*;
use linfa_clustering::{KMeans, KMeansError};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("feature rows have unequal length: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("k-means failed: {0}")]
    KMeans(#[from] KMeansError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per point, `0..k`.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Mean squared distance from each point to its centroid.
    pub inertia: f64,
}

fn to_matrix(points: &[Vec<f64>]) -> Result<Array2<f64>> {
    let dim = points.first().map_or(0, Vec::len);
    let flat: Vec<f64> = points.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((points.len(), dim), flat)?)
}

fn lexical(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Number of distinct feature rows.
fn distinct_rows(points: &[Vec<f64>]) -> usize {
    let mut rows: Vec<&Vec<f64>> = points.iter().collect();
    rows.sort_by(|a, b| lexical(a, b));
    rows.dedup_by(|a, b| lexical(a, b).is_eq());
    rows.len()
}

/// Cluster `points` into `k` groups, keeping the lowest-inertia of `n_init` runs.
///
/// `k` is clamped to the number of distinct points. Same inputs and seed give
/// the same result.
pub fn kmeans(points: &[Vec<f64>], k: usize, n_init: usize, max_iter: usize, seed: u64) -> Result<KMeansResult> {
    if points.is_empty() {
        return Ok(KMeansResult {
            labels: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
        });
    }
    let k = k.clamp(1, distinct_rows(points));
    let records = to_matrix(points)?;
    let dataset = DatasetBase::new(records, Array1::from_elem(points.len(), ()));

    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(seed))
        .n_runs(n_init.max(1))
        .max_n_iterations(max_iter.max(1) as u64)
        .tolerance(1e-4)
        .fit(&dataset)?;

    let predictions = model.predict(&dataset);
    let labels: Vec<usize> = predictions.iter().cloned().collect();
    let centroids = model
        .centroids()
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();
    let inertia = model.inertia();
    log::debug!("k-means k={k}: inertia {inertia:.4}");

    Ok(KMeansResult {
        labels,
        centroids,
        inertia,
    })
}

/// Mean silhouette coefficient over all points.
///
/// `None` unless there are at least two clusters and fewer clusters than
/// points, or when the score cannot be computed.
pub fn silhouette(points: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let mut distinct: Vec<usize> = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 2 || distinct.len() >= points.len() {
        return None;
    }

    let records = to_matrix(points).ok()?;
    let dataset = DatasetBase::new(records, Array1::from_vec(labels.to_vec()));
    match dataset.silhouette_score() {
        Ok(score) => Some(score),
        Err(e) => {
            log::debug!("silhouette undefined: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
        ]
    }

    #[test]
    fn test_separates_two_blobs() {
        let result = kmeans(&blobs(), 2, 10, 100, 42).unwrap();
        let l = &result.labels;
        assert_eq!(l[0], l[1]);
        assert_eq!(l[1], l[2]);
        assert_eq!(l[3], l[4]);
        assert_eq!(l[4], l[5]);
        assert_ne!(l[0], l[3]);
        assert_eq!(result.centroids.len(), 2);
        assert!(result.inertia < 0.05);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let points: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 7) as f64 * 0.3, (i % 3) as f64 * 0.5, i as f64 * 0.05])
            .collect();
        let a = kmeans(&points, 3, 5, 100, 7).unwrap();
        let b = kmeans(&points, 3, 5, 100, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_cluster_centre_is_mean() {
        let points = vec![vec![0.0], vec![2.0], vec![4.0]];
        let result = kmeans(&points, 1, 3, 100, 1).unwrap();
        assert_eq!(result.labels, vec![0, 0, 0]);
        assert!((result.centroids[0][0] - 2.0).abs() < 1e-9);
        assert!(result.inertia > 0.0);
    }

    #[test]
    fn test_k_clamped_to_distinct_points() {
        let points = vec![vec![0.0], vec![1.0], vec![1.0]];
        let result = kmeans(&points, 5, 2, 100, 3).unwrap();
        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.labels[1], result.labels[2]);
        assert_ne!(result.labels[0], result.labels[1]);
    }

    #[test]
    fn test_empty_input() {
        let result = kmeans(&[], 3, 2, 100, 3).unwrap();
        assert!(result.labels.is_empty());
    }

    #[test]
    fn test_distinct_rows() {
        let points = vec![vec![1.0, 2.0], vec![1.0, 2.0], vec![2.0, 1.0]];
        assert_eq!(distinct_rows(&points), 2);
    }

    #[test]
    fn test_silhouette_well_separated() {
        let s = silhouette(&blobs(), &[0, 0, 0, 1, 1, 1]).unwrap();
        assert!(s > 0.9, "silhouette {s}");
    }

    #[test]
    fn test_silhouette_prefers_true_split() {
        let good = silhouette(&blobs(), &[0, 0, 0, 1, 1, 1]).unwrap();
        let mixed = silhouette(&blobs(), &[0, 1, 0, 1, 0, 1]).unwrap();
        assert!(mixed < good);
        assert!(mixed < 0.5, "silhouette {mixed}");
    }

    #[test]
    fn test_silhouette_undefined() {
        assert_eq!(silhouette(&blobs(), &[0; 6]), None);
        assert_eq!(silhouette(&blobs(), &[0, 1, 2, 3, 4, 5]), None);
    }
}
