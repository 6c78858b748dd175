//! Single entry point over the two vectorization strategies.

use std::sync::Arc;

use chatgraph_core::config::EmbeddingConfig;
use chatgraph_core::types::VectorStrategy;
use rand::Rng;
use tracing::{debug, warn};

use crate::embedding::LazyEmbedder;
use crate::feature::FeatureVector;
use crate::tfidf::TfIdf;

/// Output of [`Vectorizer::vectorize`]: one vector per input term, in order.
#[derive(Debug, Clone)]
pub struct Vectorization {
    pub vectors: Vec<FeatureVector>,
    /// True when the embedding provider failed and random vectors were used.
    pub degraded: bool,
}

/// Converts terms into feature vectors.
#[derive(Debug, Clone)]
pub enum Vectorizer {
    /// Per-document TF-IDF weights, computed locally.
    TfIdf,
    /// Dense vectors from an external embedding provider, with a random
    /// fallback when the provider is unavailable.
    Embedding {
        embedder: Arc<LazyEmbedder>,
        fallback_dimensions: usize,
        fallback_range: f32,
    },
}

impl Vectorizer {
    /// Embedding vectorizer using the fallback settings from `config`.
    pub fn embedding(embedder: Arc<LazyEmbedder>, config: &EmbeddingConfig) -> Self {
        Self::Embedding {
            embedder,
            fallback_dimensions: config.fallback_dimensions,
            fallback_range: config.fallback_range,
        }
    }

    pub fn strategy(&self) -> VectorStrategy {
        match self {
            Self::TfIdf => VectorStrategy::Tfidf,
            Self::Embedding { .. } => VectorStrategy::Embedding,
        }
    }

    /// Vectorize `terms`. `documents` holds the token sequence of every
    /// message and is the corpus for the TF-IDF strategy.
    ///
    /// Never fails: a provider error switches this call to random vectors
    /// and marks the result as degraded.
    pub async fn vectorize<R: Rng>(
        &self,
        terms: &[String],
        documents: &[Vec<String>],
        rng: &mut R,
    ) -> Vectorization {
        match self {
            Self::TfIdf => {
                let model = TfIdf::fit(documents);
                debug!(
                    terms = terms.len(),
                    documents = model.document_count(),
                    "Computed TF-IDF term vectors"
                );
                Vectorization {
                    vectors: terms.iter().map(|t| model.term_vector(t)).collect(),
                    degraded: false,
                }
            }
            Self::Embedding {
                embedder,
                fallback_dimensions,
                fallback_range,
            } => match embed_terms(embedder, terms).await {
                Ok(vectors) => Vectorization {
                    vectors,
                    degraded: false,
                },
                Err(e) => {
                    warn!(
                        error = %e,
                        terms = terms.len(),
                        "Embedding provider unavailable, using random vectors (degraded)"
                    );
                    Vectorization {
                        vectors: random_vectors(
                            terms.len(),
                            *fallback_dimensions,
                            *fallback_range,
                            rng,
                        ),
                        degraded: true,
                    }
                }
            },
        }
    }
}

async fn embed_terms(
    embedder: &LazyEmbedder,
    terms: &[String],
) -> chatgraph_core::Result<Vec<FeatureVector>> {
    let service = embedder.get().await?;
    let mut vectors = Vec::with_capacity(terms.len());
    for term in terms {
        let embedding = service.embed_boxed(term).await?;
        vectors.push(FeatureVector::Dense(embedding));
    }
    debug!(
        terms = terms.len(),
        dimensions = service.dimensions(),
        "Embedded terms"
    );
    Ok(vectors)
}

/// Uniform vectors in `[-range, range)`. A zero or non-finite range yields
/// zero vectors.
fn random_vectors<R: Rng>(
    count: usize,
    dimensions: usize,
    range: f32,
    rng: &mut R,
) -> Vec<FeatureVector> {
    let range = range.abs();
    let usable = range.is_finite() && range > 0.0;
    (0..count)
        .map(|_| {
            FeatureVector::Dense(
                (0..dimensions)
                    .map(|_| {
                        if usable {
                            rng.random_range(-range..range)
                        } else {
                            0.0
                        }
                    })
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DynEmbeddingService, MockEmbedding};
    use chatgraph_core::error::ChatGraphError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn failing_vectorizer() -> Vectorizer {
        let embedder = LazyEmbedder::new(|| Err(ChatGraphError::Embedding("offline".into())));
        Vectorizer::Embedding {
            embedder: Arc::new(embedder),
            fallback_dimensions: 12,
            fallback_range: 0.5,
        }
    }

    #[tokio::test]
    async fn test_tfidf_vectorizer_produces_sparse_vectors() {
        let documents = vec![strings(&["cat", "dog"]), strings(&["cat", "bird"])];
        let terms = strings(&["cat", "dog", "bird"]);
        let mut rng = StdRng::seed_from_u64(1);

        let out = Vectorizer::TfIdf
            .vectorize(&terms, &documents, &mut rng)
            .await;
        assert!(!out.degraded);
        assert_eq!(out.vectors.len(), 3);
        assert!(out.vectors.iter().all(|v| v.is_sparse()));
        // "cat" occurs everywhere, so its weights are all zero.
        assert_eq!(out.vectors[0].norm(), 0.0);
        assert!(out.vectors[1].norm() > 0.0);
    }

    #[tokio::test]
    async fn test_embedding_vectorizer_uses_provider() {
        let embedder = LazyEmbedder::ready(
            Arc::new(MockEmbedding::with_dimensions(8)) as Arc<dyn DynEmbeddingService>
        );
        let vectorizer = Vectorizer::Embedding {
            embedder: Arc::new(embedder),
            fallback_dimensions: 384,
            fallback_range: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let out = vectorizer
            .vectorize(&strings(&["hello", "world"]), &[], &mut rng)
            .await;
        assert!(!out.degraded);
        assert_eq!(out.vectors.len(), 2);
        assert_eq!(out.vectors[0].len(), 8);
        assert_eq!(vectorizer.strategy(), VectorStrategy::Embedding);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_random_vectors() {
        let vectorizer = failing_vectorizer();
        let mut rng = StdRng::seed_from_u64(7);
        let out = vectorizer
            .vectorize(&strings(&["alpha", "beta", "gamma"]), &[], &mut rng)
            .await;
        assert!(out.degraded);
        assert_eq!(out.vectors.len(), 3);
        for v in &out.vectors {
            assert_eq!(v.len(), 12);
            match v {
                FeatureVector::Dense(values) => {
                    assert!(values.iter().all(|x| (-0.5..0.5).contains(x)))
                }
                FeatureVector::Sparse(_) => panic!("fallback vectors are dense"),
            }
        }
    }

    #[tokio::test]
    async fn test_degenerate_fallback_range_gives_zero_vectors() {
        for range in [0.0, -0.0, f32::NAN, f32::INFINITY] {
            let vectorizer = Vectorizer::Embedding {
                embedder: Arc::new(LazyEmbedder::new(|| {
                    Err(ChatGraphError::Embedding("offline".into()))
                })),
                fallback_dimensions: 4,
                fallback_range: range,
            };
            let out = vectorizer
                .vectorize(&strings(&["rust", "borrow"]), &[], &mut StdRng::seed_from_u64(1))
                .await;
            assert!(out.degraded);
            for v in &out.vectors {
                assert_eq!(v, &FeatureVector::Dense(vec![0.0; 4]));
            }
        }
    }

    #[tokio::test]
    async fn test_negative_fallback_range_uses_magnitude() {
        let vectorizer = Vectorizer::Embedding {
            embedder: Arc::new(LazyEmbedder::new(|| {
                Err(ChatGraphError::Embedding("offline".into()))
            })),
            fallback_dimensions: 6,
            fallback_range: -0.25,
        };
        let out = vectorizer
            .vectorize(&strings(&["alpha"]), &[], &mut StdRng::seed_from_u64(2))
            .await;
        match &out.vectors[0] {
            FeatureVector::Dense(values) => {
                assert!(values.iter().all(|x| (-0.25..0.25).contains(x)))
            }
            FeatureVector::Sparse(_) => panic!("fallback vectors are dense"),
        }
    }

    #[tokio::test]
    async fn test_degraded_vectors_follow_seed() {
        let vectorizer = failing_vectorizer();
        let terms = strings(&["one", "two"]);
        let a = vectorizer
            .vectorize(&terms, &[], &mut StdRng::seed_from_u64(3))
            .await;
        let b = vectorizer
            .vectorize(&terms, &[], &mut StdRng::seed_from_u64(3))
            .await;
        assert_eq!(a.vectors, b.vectors);
    }
}
