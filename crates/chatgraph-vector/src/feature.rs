//! Feature vectors shared by both vectorization strategies.
//!
//! A vector is either dense (embedding dimensions) or sparse (keyed by
//! document index). Distance and similarity are computed over the union of
//! present keys, with absent keys read as zero, so the two shapes can be
//! compared with each other as well.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Convergence threshold for centroids of dense vectors.
pub const DENSE_TOLERANCE: f64 = 1e-6;

/// Convergence threshold for centroids of sparse vectors.
pub const SPARSE_TOLERANCE: f64 = 1e-3;

/// A numeric feature vector keyed by dimension, document index, or term slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureVector {
    /// Fixed-length vector; key `i` is position `i`.
    Dense(Vec<f32>),
    /// Only the non-zero keys are stored.
    Sparse(BTreeMap<usize, f64>),
}

impl FeatureVector {
    /// Value stored under `key`, or 0 when absent.
    pub fn get(&self, key: usize) -> f64 {
        match self {
            Self::Dense(values) => values.get(key).map(|&v| v as f64).unwrap_or(0.0),
            Self::Sparse(values) => values.get(&key).copied().unwrap_or(0.0),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(values) => values.len(),
            Self::Sparse(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// L2 norm.
    pub fn norm(&self) -> f64 {
        match self {
            Self::Dense(values) => values
                .iter()
                .map(|&v| (v as f64) * (v as f64))
                .sum::<f64>()
                .sqrt(),
            Self::Sparse(values) => values.values().map(|v| v * v).sum::<f64>().sqrt(),
        }
    }

    /// Euclidean distance over the union of present keys.
    pub fn euclidean_distance(&self, other: &FeatureVector) -> f64 {
        let mut sum = 0.0;
        self.zip_union(other, |a, b| {
            let diff = a - b;
            sum += diff * diff;
        });
        sum.sqrt()
    }

    /// Cosine similarity over the union of present keys.
    ///
    /// Defined as 0 when either vector has zero norm.
    pub fn cosine_similarity(&self, other: &FeatureVector) -> f64 {
        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        self.zip_union(other, |a, b| {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        });
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }

    /// Coordinate-wise mean of `points`, or `None` when there are none.
    ///
    /// The result is dense only when every point is dense; otherwise it is
    /// sparse over the union of the points' keys.
    pub fn mean<'a, I>(points: I) -> Option<FeatureVector>
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        let points: Vec<&FeatureVector> = points.into_iter().collect();
        if points.is_empty() {
            return None;
        }
        let count = points.len() as f64;

        if points.iter().all(|p| !p.is_sparse()) {
            let width = points.iter().map(|p| p.len()).max().unwrap_or(0);
            let mut sums = vec![0.0f64; width];
            for point in &points {
                if let Self::Dense(values) = point {
                    for (slot, &v) in sums.iter_mut().zip(values) {
                        *slot += v as f64;
                    }
                }
            }
            return Some(Self::Dense(
                sums.into_iter().map(|s| (s / count) as f32).collect(),
            ));
        }

        let mut sums: BTreeMap<usize, f64> = BTreeMap::new();
        for point in &points {
            match point {
                Self::Dense(values) => {
                    for (key, &v) in values.iter().enumerate() {
                        *sums.entry(key).or_insert(0.0) += v as f64;
                    }
                }
                Self::Sparse(values) => {
                    for (&key, &v) in values {
                        *sums.entry(key).or_insert(0.0) += v;
                    }
                }
            }
        }
        for value in sums.values_mut() {
            *value /= count;
        }
        Some(Self::Sparse(sums))
    }

    /// Movement below which a centroid of this shape counts as converged.
    pub fn convergence_tolerance(&self) -> f64 {
        if self.is_sparse() {
            SPARSE_TOLERANCE
        } else {
            DENSE_TOLERANCE
        }
    }

    /// Visit every key present in either vector once, as `(self, other)` values.
    fn zip_union(&self, other: &FeatureVector, mut f: impl FnMut(f64, f64)) {
        match (self, other) {
            (Self::Dense(a), Self::Dense(b)) => {
                for i in 0..a.len().max(b.len()) {
                    let x = a.get(i).map(|&v| v as f64).unwrap_or(0.0);
                    let y = b.get(i).map(|&v| v as f64).unwrap_or(0.0);
                    f(x, y);
                }
            }
            (Self::Sparse(a), Self::Sparse(b)) => {
                let mut left = a.iter().map(|(&k, &v)| (k, v)).peekable();
                let mut right = b.iter().map(|(&k, &v)| (k, v)).peekable();
                loop {
                    match (left.peek().copied(), right.peek().copied()) {
                        (Some((ka, va)), Some((kb, vb))) => {
                            if ka < kb {
                                f(va, 0.0);
                                left.next();
                            } else if kb < ka {
                                f(0.0, vb);
                                right.next();
                            } else {
                                f(va, vb);
                                left.next();
                                right.next();
                            }
                        }
                        (Some((_, va)), None) => {
                            f(va, 0.0);
                            left.next();
                        }
                        (None, Some((_, vb))) => {
                            f(0.0, vb);
                            right.next();
                        }
                        (None, None) => break,
                    }
                }
            }
            (Self::Dense(d), Self::Sparse(s)) => zip_mixed(d, s, &mut f),
            (Self::Sparse(s), Self::Dense(d)) => zip_mixed(d, s, |x, y| f(y, x)),
        }
    }
}

fn zip_mixed(dense: &[f32], sparse: &BTreeMap<usize, f64>, mut f: impl FnMut(f64, f64)) {
    for (key, &v) in dense.iter().enumerate() {
        f(v as f64, sparse.get(&key).copied().unwrap_or(0.0));
    }
    for (_, &v) in sparse.range(dense.len()..) {
        f(0.0, v);
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self::Dense(values)
    }
}

impl From<BTreeMap<usize, f64>> for FeatureVector {
    fn from(values: BTreeMap<usize, f64>) -> Self {
        Self::Sparse(values)
    }
}
