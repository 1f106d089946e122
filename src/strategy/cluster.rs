//! K-means over (distance, shipment count)
//!
//! k-means++ seeding from a fixed-seed `ChaCha8Rng`, then Lloyd iterations.
//! Features are used unscaled. Clusters are relabelled by ascending centroid
//! distance, so cluster 0 is always the one closest to the agency and the
//! output is reproducible across runs and platforms.

use super::CommuneProfile;
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Seed of the k-means++ initialisation
pub const DEFAULT_SEED: u64 = 42;

/// Accepted cluster counts
pub const K_RANGE: std::ops::RangeInclusive<usize> = 2..=6;

const MAX_ITERATIONS: usize = 300;

type Point = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Cluster of each input profile, aligned with the input
    pub assignments: Vec<usize>,
    /// `[distance_km, shipments]` per cluster
    pub centroids: Vec<Point>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Indices of the profiles in `cluster`
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

fn dist2(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

fn nearest(p: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = dist2(p, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn seed_centroids(points: &[Point], k: usize, rng: &mut ChaCha8Rng) -> Vec<Point> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())]];
    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();
        let target = rng.gen::<f64>() * total;
        let mut acc = 0.0;
        // fall back to the last point with non-zero weight on rounding overshoot
        let mut chosen = weights.iter().rposition(|&w| w > 0.0).unwrap_or(0);
        for (i, w) in weights.iter().enumerate() {
            acc += w;
            if *w > 0.0 && acc > target {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen]);
    }
    centroids
}

/// Cluster communes into `k` groups with the default seed
pub fn kmeans(profiles: &[CommuneProfile], k: usize) -> Result<Clustering> {
    kmeans_seeded(profiles, k, DEFAULT_SEED)
}

/// Cluster communes into `k` groups
///
/// Requires `k` within [`K_RANGE`] and at least `k` distinct points.
pub fn kmeans_seeded(profiles: &[CommuneProfile], k: usize, seed: u64) -> Result<Clustering> {
    if !K_RANGE.contains(&k) {
        return Err(Error::input(format!(
            "cluster count must be between {} and {}, got {}",
            K_RANGE.start(),
            K_RANGE.end(),
            k
        )));
    }
    let points: Vec<Point> = profiles
        .iter()
        .map(|p| [p.distance_km, p.shipments as f64])
        .collect();
    if let Some(p) = points.iter().find(|p| !p[0].is_finite()) {
        return Err(Error::input(format!("distance {} is not finite", p[0])));
    }
    let mut distinct: Vec<Point> = points.clone();
    distinct.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    distinct.dedup();
    if distinct.len() < k {
        return Err(Error::input(format!(
            "{} distinct communes cannot form {} clusters",
            distinct.len(),
            k
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = seed_centroids(&points, k, &mut rng);
    let mut assignments = vec![usize::MAX; points.len()];
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids).0).collect();
        let changed = next != assignments;
        assignments = next;
        if !changed {
            break;
        }
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let mut sum = [0.0, 0.0];
            let mut n = 0usize;
            for (p, _) in points.iter().zip(&assignments).filter(|(_, &a)| a == c) {
                sum[0] += p[0];
                sum[1] += p[1];
                n += 1;
            }
            // an emptied cluster keeps its previous centroid
            if n > 0 {
                *centroid = [sum[0] / n as f64, sum[1] / n as f64];
            }
        }
    }

    // relabel by ascending centroid distance
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        centroids[a][0]
            .total_cmp(&centroids[b][0])
            .then(centroids[a][1].total_cmp(&centroids[b][1]))
    });
    let mut relabel = vec![0; k];
    for (new, &old) in order.iter().enumerate() {
        relabel[old] = new;
    }
    let centroids: Vec<Point> = order.iter().map(|&i| centroids[i]).collect();
    let assignments: Vec<usize> = assignments.iter().map(|&a| relabel[a]).collect();
    let inertia = points
        .iter()
        .zip(&assignments)
        .map(|(p, &a)| dist2(p, &centroids[a]))
        .sum();

    tracing::debug!(k, iterations, inertia, "k-means converged");
    Ok(Clustering {
        assignments,
        centroids,
        inertia,
        iterations,
    })
}
