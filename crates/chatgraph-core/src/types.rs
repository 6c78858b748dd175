use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// How terms are turned into feature vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStrategy {
    /// Dense vectors from an external sentence-embedding model.
    Embedding,
    /// Sparse per-document TF-IDF weights computed from the message set.
    #[default]
    Tfidf,
}

impl VectorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Tfidf => "tfidf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "embedding" => Some(Self::Embedding),
            "tfidf" => Some(Self::Tfidf),
            _ => None,
        }
    }

    /// Edge rule used when the configuration does not name one.
    pub fn default_edge_rule(&self) -> EdgeRule {
        match self {
            Self::Embedding => EdgeRule::ClusterAndSimilarity,
            Self::Tfidf => EdgeRule::ClusterOrCooccurrence,
        }
    }
}

/// Predicate deciding whether two retained nodes are joined by an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRule {
    /// Same cluster AND cosine similarity above the threshold.
    /// Weight is the cosine similarity.
    ClusterAndSimilarity,
    /// Same cluster OR co-occurrence above the threshold.
    /// Weight is the co-occurrence, floored.
    ClusterOrCooccurrence,
}

impl EdgeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClusterAndSimilarity => "cluster_and_similarity",
            Self::ClusterOrCooccurrence => "cluster_or_cooccurrence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cluster_and_similarity" => Some(Self::ClusterAndSimilarity),
            "cluster_or_cooccurrence" => Some(Self::ClusterOrCooccurrence),
            _ => None,
        }
    }
}

// =============================================================================
// Input records
// =============================================================================

/// A chat message, the only input to the clustering pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time and no author.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author_id: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = author_id.into();
        self
    }
}
