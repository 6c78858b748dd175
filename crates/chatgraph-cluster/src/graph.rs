//! Keyword graph construction.
//!
//! Runs the full pipeline for one snapshot of the message set: tokenize,
//! vectorize, cluster, build nodes, cap, and connect. Every call recomputes
//! from scratch; nothing is carried over between calls except the embedding
//! provider held by the vectorizer.

use std::collections::HashMap;
use std::sync::Mutex;

use chatgraph_core::config::ClusteringConfig;
use chatgraph_core::types::{EdgeRule, Message, VectorStrategy};
use chatgraph_vector::Vectorizer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::kmeans::kmeans;
use crate::tokenizer::tokenize;
use crate::types::{ClusterEdge, ClusterGraph, ClusterNode};

/// A graph together with how it was produced.
#[derive(Debug, Clone)]
pub struct GraphReport {
    pub graph: ClusterGraph,
    pub strategy: VectorStrategy,
    /// True when the embedding provider failed and random vectors stood in.
    pub degraded: bool,
    /// Distinct terms found before the node cap was applied.
    pub term_count: usize,
    pub kmeans_iterations: usize,
}

/// Builds [`ClusterGraph`]s from messages.
///
/// Holds the clustering thresholds, the vectorization strategy, and the
/// random source used for k-means initialization and degraded vectors.
/// Seeding the random source (`ClusteringConfig::seed`) makes output
/// reproducible for the TF-IDF strategy.
pub struct GraphBuilder {
    config: ClusteringConfig,
    vectorizer: Vectorizer,
    rng: Mutex<StdRng>,
}

/// A distinct term and the messages that contain it.
struct TermEntry {
    term: String,
    message_ids: Vec<String>,
}

impl GraphBuilder {
    /// Create a builder. The strategy recorded in `config` is replaced by
    /// the vectorizer's own so the default edge rule always matches it.
    ///
    /// A config that fails validation is replaced by the defaults, keeping
    /// only its seed and explicit edge rule.
    pub fn new(mut config: ClusteringConfig, vectorizer: Vectorizer) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Invalid clustering config, using defaults");
            config = ClusteringConfig {
                seed: config.seed,
                edge_rule: config.edge_rule,
                ..ClusteringConfig::default()
            };
        }
        config.strategy = vectorizer.strategy();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            vectorizer,
            rng: Mutex::new(rng),
        }
    }

    /// Builder using the TF-IDF strategy.
    pub fn tfidf(config: ClusteringConfig) -> Self {
        Self::new(config, Vectorizer::TfIdf)
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn edge_rule(&self) -> EdgeRule {
        self.config.effective_edge_rule()
    }

    /// Build the graph for `messages` with `k` requested clusters.
    pub async fn build(&self, messages: &[Message], k: usize) -> ClusterGraph {
        self.build_report(messages, k).await.graph
    }

    /// Build the graph using the configured `k`.
    pub async fn build_default(&self, messages: &[Message]) -> ClusterGraph {
        self.build(messages, self.config.k).await
    }

    /// Build the graph and report how it was produced.
    pub async fn build_report(&self, messages: &[Message], k: usize) -> GraphReport {
        let strategy = self.vectorizer.strategy();
        let (entries, documents) = collect_terms(messages);
        debug!(
            messages = messages.len(),
            terms = entries.len(),
            "Tokenized messages"
        );

        if entries.is_empty() {
            return GraphReport {
                graph: ClusterGraph::empty(),
                strategy,
                degraded: false,
                term_count: 0,
                kmeans_iterations: 0,
            };
        }

        let mut rng = self.call_rng();
        let terms: Vec<String> = entries.iter().map(|e| e.term.clone()).collect();
        let vectorization = self.vectorizer.vectorize(&terms, &documents, &mut rng).await;
        let clustering = kmeans(
            &vectorization.vectors,
            k,
            self.config.max_kmeans_iterations,
            &mut rng,
        );

        let term_count = entries.len();
        let nodes = self.retain_nodes(
            entries
                .into_iter()
                .zip(clustering.assignments)
                .zip(vectorization.vectors)
                .map(|((entry, cluster_id), vector)| ClusterNode {
                    id: String::new(),
                    label: entry.term,
                    cluster_id,
                    first_message_id: entry.message_ids[0].clone(),
                    frequency: entry.message_ids.len(),
                    message_ids: entry.message_ids,
                    vector,
                })
                .collect(),
        );
        let edges = self.connect(&nodes);

        info!(
            messages = messages.len(),
            terms = term_count,
            nodes = nodes.len(),
            edges = edges.len(),
            strategy = strategy.as_str(),
            degraded = vectorization.degraded,
            "Cluster graph built"
        );

        GraphReport {
            graph: ClusterGraph { nodes, edges },
            strategy,
            degraded: vectorization.degraded,
            term_count,
            kmeans_iterations: clustering.iterations,
        }
    }

    /// Independent random source for one build, drawn from the shared one.
    fn call_rng(&self) -> StdRng {
        let mut shared = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        StdRng::seed_from_u64(shared.random())
    }

    /// Apply the node cap and assign dense ids.
    ///
    /// Over the cap, the most frequent terms are kept; ties keep discovery order.
    fn retain_nodes(&self, mut nodes: Vec<ClusterNode>) -> Vec<ClusterNode> {
        if nodes.len() > self.config.max_nodes {
            nodes.sort_by(|a, b| b.frequency.cmp(&a.frequency));
            nodes.truncate(self.config.max_nodes);
        }
        for (index, node) in nodes.iter_mut().enumerate() {
            node.id = format!("term-{}", index);
        }
        nodes
    }

    /// Evaluate every unordered node pair against the edge rule.
    fn connect(&self, nodes: &[ClusterNode]) -> Vec<ClusterEdge> {
        let rule = self.edge_rule();
        let mut edges = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if let Some(weight) = self.edge_weight(rule, a, b) {
                    edges.push(ClusterEdge {
                        source_node_id: a.id.clone(),
                        target_node_id: b.id.clone(),
                        weight,
                    });
                }
            }
        }
        edges
    }

    fn edge_weight(&self, rule: EdgeRule, a: &ClusterNode, b: &ClusterNode) -> Option<f64> {
        let same_cluster = a.cluster_id == b.cluster_id;
        match rule {
            EdgeRule::ClusterAndSimilarity => {
                if !same_cluster {
                    return None;
                }
                let similarity = a.vector.cosine_similarity(&b.vector);
                (similarity > self.config.similarity_threshold && similarity > 0.0)
                    .then(|| similarity.min(1.0))
            }
            EdgeRule::ClusterOrCooccurrence => {
                let cooccurrence = cooccurrence(a, b);
                (same_cluster || cooccurrence > self.config.cooccurrence_threshold)
                    .then(|| cooccurrence.max(self.config.edge_weight_floor))
            }
        }
    }
}

/// Shared messages divided by the larger of the two message counts.
pub fn cooccurrence(a: &ClusterNode, b: &ClusterNode) -> f64 {
    let larger = a.message_ids.len().max(b.message_ids.len());
    if larger == 0 {
        return 0.0;
    }
    let shared = a
        .message_ids
        .iter()
        .filter(|id| b.message_ids.contains(id))
        .count();
    shared as f64 / larger as f64
}

/// Tokenize every message. Returns the distinct terms in discovery order,
/// each with the ids of the messages containing it, and the token sequence
/// of every message.
fn collect_terms(messages: &[Message]) -> (Vec<TermEntry>, Vec<Vec<String>>) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<TermEntry> = Vec::new();
    let mut documents = Vec::with_capacity(messages.len());

    for message in messages {
        let tokens = tokenize(&message.text);
        for token in &tokens {
            let slot = *index.entry(token.clone()).or_insert_with(|| {
                entries.push(TermEntry {
                    term: token.clone(),
                    message_ids: Vec::new(),
                });
                entries.len() - 1
            });
            let ids = &mut entries[slot].message_ids;
            if !ids.contains(&message.id) {
                ids.push(message.id.clone());
            }
        }
        documents.push(tokens);
    }

    (entries, documents)
}
