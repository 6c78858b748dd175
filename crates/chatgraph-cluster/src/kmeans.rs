//! K-means over feature vectors of either shape.

use chatgraph_vector::FeatureVector;
use rand::Rng;
use tracing::debug;

/// Default upper bound on refinement iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Result of a k-means run.
#[derive(Debug, Clone, Default)]
pub struct KMeansResult {
    /// Cluster id in `[0, k)` for each input vector, in input order.
    pub assignments: Vec<usize>,
    pub centroids: Vec<FeatureVector>,
    /// Number of assignment/update rounds performed.
    pub iterations: usize,
    /// True if the centroids settled before the iteration limit.
    pub converged: bool,
}

/// Partition `vectors` into at most `k` clusters.
///
/// `k` is clamped to the number of vectors (and to at least 1). Initial
/// centroids are `k` distinct input points sampled without replacement from
/// `rng`. Each round assigns every vector to its nearest centroid (ties go to
/// the lowest centroid index), then moves every centroid to the mean of its
/// members; a centroid with no members keeps its position. Stops early once
/// no centroid moves by its shape's tolerance or more.
pub fn kmeans<R: Rng>(
    vectors: &[FeatureVector],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> KMeansResult {
    if vectors.is_empty() {
        return KMeansResult::default();
    }

    let k = k.clamp(1, vectors.len());
    let mut centroids: Vec<FeatureVector> = rand::seq::index::sample(rng, vectors.len(), k)
        .into_iter()
        .map(|i| vectors[i].clone())
        .collect();
    let mut assignments = vec![0usize; vectors.len()];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..max_iterations.max(1) {
        iterations += 1;

        for (slot, vector) in assignments.iter_mut().zip(vectors) {
            *slot = nearest_centroid(vector, &centroids);
        }

        let updated: Vec<FeatureVector> = centroids
            .iter()
            .enumerate()
            .map(|(cluster, previous)| {
                let members = vectors
                    .iter()
                    .zip(&assignments)
                    .filter(|(_, &assigned)| assigned == cluster)
                    .map(|(v, _)| v);
                FeatureVector::mean(members).unwrap_or_else(|| previous.clone())
            })
            .collect();

        converged = centroids
            .iter()
            .zip(&updated)
            .all(|(old, new)| old.euclidean_distance(new) < new.convergence_tolerance());
        centroids = updated;

        if converged {
            break;
        }
    }

    debug!(
        points = vectors.len(),
        k,
        iterations,
        converged,
        "K-means finished"
    );

    KMeansResult {
        assignments,
        centroids,
        iterations,
        converged,
    }
}

/// Index of the closest centroid; the first one wins on ties.
fn nearest_centroid(vector: &FeatureVector, centroids: &[FeatureVector]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = vector.euclidean_distance(centroid);
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}
