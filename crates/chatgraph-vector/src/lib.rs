//! chatgraph vector crate - feature vectors, TF-IDF statistics, embedding
//! providers, and the vectorizer that picks between them.
//!
//! Both vectorization strategies produce [`FeatureVector`]s, which share one
//! definition of Euclidean distance and cosine similarity regardless of
//! whether they are dense (embeddings) or sparse (TF-IDF).

pub mod embedding;
pub mod feature;
pub mod tfidf;
pub mod vectorizer;

pub use embedding::{
    DynEmbeddingService, EmbeddingService, LazyEmbedder, MockEmbedding, OnnxEmbeddingService,
};
pub use feature::FeatureVector;
pub use tfidf::TfIdf;
pub use vectorizer::{Vectorization, Vectorizer};
