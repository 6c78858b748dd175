use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChatGraphError, Result};
use crate::types::{EdgeRule, VectorStrategy};

/// Top-level configuration for chatgraph.
///
/// Loaded from `~/.chatgraph/config.toml` by default. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatGraphConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl ChatGraphConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ChatGraphConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        self.embedding.validate()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Clustering pipeline settings: vectorization strategy, k-means and graph thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Vectorization strategy: "embedding" or "tfidf".
    pub strategy: VectorStrategy,
    /// Requested number of k-means clusters.
    pub k: usize,
    /// Maximum number of nodes kept in the output graph.
    pub max_nodes: usize,
    /// Cosine similarity a same-cluster pair must exceed (embedding rule).
    pub similarity_threshold: f64,
    /// Co-occurrence a pair must exceed to be joined regardless of cluster (tfidf rule).
    pub cooccurrence_threshold: f64,
    /// Upper bound on k-means refinement iterations.
    pub max_kmeans_iterations: usize,
    /// Minimum edge weight under the co-occurrence rule.
    pub edge_weight_floor: f64,
    /// Edge predicate. When unset the strategy's own rule applies.
    pub edge_rule: Option<EdgeRule>,
    /// Seed for k-means initialization and fallback vectors. Unset means OS entropy.
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: VectorStrategy::Tfidf,
            k: 3,
            max_nodes: 15,
            similarity_threshold: 0.5,
            cooccurrence_threshold: 0.2,
            max_kmeans_iterations: 100,
            edge_weight_floor: 0.3,
            edge_rule: None,
            seed: None,
        }
    }
}

impl ClusteringConfig {
    /// The edge rule in force: the explicit one, else the strategy default.
    pub fn effective_edge_rule(&self) -> EdgeRule {
        self.edge_rule
            .unwrap_or_else(|| self.strategy.default_edge_rule())
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ChatGraphError::Config("clustering.k must be at least 1".into()));
        }
        if self.max_nodes == 0 {
            return Err(ChatGraphError::Config(
                "clustering.max_nodes must be at least 1".into(),
            ));
        }
        if self.max_kmeans_iterations == 0 {
            return Err(ChatGraphError::Config(
                "clustering.max_kmeans_iterations must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ChatGraphError::Config(format!(
                "clustering.similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.cooccurrence_threshold) {
            return Err(ChatGraphError::Config(format!(
                "clustering.cooccurrence_threshold must be within [0, 1], got {}",
                self.cooccurrence_threshold
            )));
        }
        if !(self.edge_weight_floor > 0.0 && self.edge_weight_floor <= 1.0) {
            return Err(ChatGraphError::Config(format!(
                "clustering.edge_weight_floor must be within (0, 1], got {}",
                self.edge_weight_floor
            )));
        }
        Ok(())
    }
}

/// External embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    /// Length of the random vectors used when the provider is unavailable.
    pub fallback_dimensions: usize,
    /// Degraded vectors are drawn uniformly from `[-fallback_range, fallback_range)`.
    pub fallback_range: f32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: "~/.chatgraph/models/all-MiniLM-L6-v2".to_string(),
            fallback_dimensions: 384,
            fallback_range: 0.5,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fallback_dimensions == 0 {
            return Err(ChatGraphError::Config(
                "embedding.fallback_dimensions must be at least 1".into(),
            ));
        }
        if !(self.fallback_range.is_finite() && self.fallback_range > 0.0) {
            return Err(ChatGraphError::Config(format!(
                "embedding.fallback_range must be positive, got {}",
                self.fallback_range
            )));
        }
        Ok(())
    }
}
