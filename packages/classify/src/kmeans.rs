//! Seeded k-means (k = 3) over the three normalized AP features.
//!
//! Initialization is k-means++ driven by a [`StdRng`] seeded from the
//! config, repeated `n_init` times; the run with the lowest inertia wins.
//! Group ids carry no meaning: the [`crate::rank`] step orders them.

use std::collections::BTreeSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ClassifyError;
use crate::config::ClassifyConfig;

/// Number of condition groups.
pub const K: usize = 3;

/// A feature vector: `[age, usage, density]`.
pub type Point = [f64; 3];

/// Result of clustering one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// Group id in `0..K` for every input point, in input order.
    pub labels: Vec<usize>,
    /// Final centroid of each group.
    pub centroids: [Point; K],
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning initialization.
    pub iterations: usize,
}

impl ClusterAssignment {
    /// Number of points assigned to each group.
    #[must_use]
    pub fn group_sizes(&self) -> [usize; K] {
        let mut sizes = [0; K];
        for &label in &self.labels {
            if let Some(size) = sizes.get_mut(label) {
                *size += 1;
            }
        }
        sizes
    }
}

/// Partitions `points` into [`K`] groups.
///
/// # Errors
///
/// Returns [`ClassifyError::InsufficientData`] if `points` is empty or
/// contains fewer than [`K`] distinct feature combinations.
pub fn assign_clusters(
    points: &[Point],
    config: &ClassifyConfig,
) -> Result<ClusterAssignment, ClassifyError> {
    if points.is_empty() {
        return Err(ClassifyError::InsufficientData {
            reason: "batch is empty".to_string(),
        });
    }

    let distinct = count_distinct(points);
    if distinct < K {
        return Err(ClassifyError::InsufficientData {
            reason: format!("{distinct} distinct feature combinations, need at least {K}"),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<ClusterAssignment> = None;

    for run in 0..config.n_init.max(1) {
        let centroids = init_plus_plus(points, &mut rng)?;
        let result = lloyd(points, centroids, config);
        log::debug!(
            "k-means run {run}: inertia {:.6} after {} iterations",
            result.inertia,
            result.iterations
        );
        if best.as_ref().is_none_or(|b| result.inertia < b.inertia) {
            best = Some(result);
        }
    }

    best.ok_or_else(|| ClassifyError::InsufficientData {
        reason: "no clustering run completed".to_string(),
    })
}

/// Counts distinct feature vectors (bitwise, with `-0.0` folded into `0.0`).
fn count_distinct(points: &[Point]) -> usize {
    points
        .iter()
        .map(|p| p.map(|v| (v + 0.0).to_bits()))
        .collect::<BTreeSet<_>>()
        .len()
}

fn squared_dist(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid. Ties go to the lowest index.
fn nearest(point: &Point, centroids: &[Point; K]) -> usize {
    let mut best = 0;
    let mut best_dist = squared_dist(point, &centroids[0]);
    for (idx, centroid) in centroids.iter().enumerate().skip(1) {
        let d = squared_dist(point, centroid);
        if d < best_dist {
            best = idx;
            best_dist = d;
        }
    }
    best
}

/// k-means++ seeding: first centroid uniform, the rest sampled with
/// probability proportional to squared distance from the nearest chosen
/// centroid. Duplicates of chosen centroids have zero weight, so the
/// seeds are always distinct points.
fn init_plus_plus(points: &[Point], rng: &mut StdRng) -> Result<[Point; K], ClassifyError> {
    let mut chosen: Vec<Point> = Vec::with_capacity(K);
    chosen.push(points[rng.gen_range(0..points.len())]);

    while chosen.len() < K {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                chosen
                    .iter()
                    .map(|c| squared_dist(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let dist = WeightedIndex::new(&weights).map_err(|e| ClassifyError::InsufficientData {
            reason: format!("cannot seed centroid {}: {e}", chosen.len()),
        })?;
        chosen.push(points[dist.sample(rng)]);
    }

    Ok([chosen[0], chosen[1], chosen[2]])
}

fn lloyd(points: &[Point], mut centroids: [Point; K], config: &ClassifyConfig) -> ClusterAssignment {
    let mut labels = vec![usize::MAX; points.len()];
    let mut iterations = 0;

    while iterations < config.max_iterations.max(1) {
        iterations += 1;
        if !assign(points, &centroids, &mut labels) {
            break;
        }
        let shift = update_centroids(points, &mut labels, &mut centroids);
        if shift <= config.tolerance {
            assign(points, &centroids, &mut labels);
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_dist(p, &centroids[l]))
        .sum();

    ClusterAssignment {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Assigns each point to its nearest centroid. Returns whether any label
/// changed.
fn assign(points: &[Point], centroids: &[Point; K], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in points.iter().zip(labels.iter_mut()) {
        let n = nearest(point, centroids);
        if *label != n {
            *label = n;
            changed = true;
        }
    }
    changed
}

/// Recomputes centroids as member means and returns the largest squared
/// centroid shift. An empty group takes over the point farthest from its
/// own centroid (drawn from a group with more than one member).
#[allow(clippy::cast_precision_loss)]
fn update_centroids(points: &[Point], labels: &mut [usize], centroids: &mut [Point; K]) -> f64 {
    let mut counts = [0usize; K];
    for &l in labels.iter() {
        counts[l] += 1;
    }

    for empty in 0..K {
        if counts[empty] > 0 {
            continue;
        }
        let farthest = points
            .iter()
            .enumerate()
            .filter(|&(i, _)| counts[labels[i]] > 1)
            .max_by(|&(i, a), &(j, b)| {
                squared_dist(a, &centroids[labels[i]])
                    .total_cmp(&squared_dist(b, &centroids[labels[j]]))
            })
            .map(|(i, _)| i);
        if let Some(i) = farthest {
            log::debug!("Relocating empty group {empty} to point {i}");
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] += 1;
        }
    }

    let mut sums = [[0.0f64; 3]; K];
    for (point, &l) in points.iter().zip(labels.iter()) {
        for (sum, v) in sums[l].iter_mut().zip(point) {
            *sum += v;
        }
    }

    let mut shift = 0.0f64;
    for c in 0..K {
        if counts[c] == 0 {
            continue;
        }
        let n = counts[c] as f64;
        let updated = sums[c].map(|s| s / n);
        shift = shift.max(squared_dist(&updated, &centroids[c]));
        centroids[c] = updated;
    }
    shift
}
