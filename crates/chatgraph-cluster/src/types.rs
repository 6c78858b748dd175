use chatgraph_vector::FeatureVector;
use serde::{Deserialize, Serialize};

/// One keyword in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    /// `term-<n>`, dense over the nodes of one graph.
    pub id: String,
    /// The normalized term.
    pub label: String,
    pub cluster_id: usize,
    /// Ids of the messages containing the term, in message order, no repeats.
    pub message_ids: Vec<String>,
    /// Message in which the term was first seen.
    pub first_message_id: String,
    /// Always `message_ids.len()`.
    pub frequency: usize,
    #[serde(skip_deserializing, default = "empty_vector")]
    pub vector: FeatureVector,
}

fn empty_vector() -> FeatureVector {
    FeatureVector::Dense(Vec::new())
}

/// Undirected weighted edge between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    /// Always within (0, 1].
    pub weight: f64,
}

/// Keyword graph produced from one snapshot of the message set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterGraph {
    pub nodes: Vec<ClusterNode>,
    pub edges: Vec<ClusterEdge>,
}

impl ClusterGraph {
    /// The graph with no nodes and no edges.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_label(&self, label: &str) -> Option<&ClusterNode> {
        self.nodes.iter().find(|n| n.label == label)
    }

    /// Ids of the messages containing `label`, or an empty slice if the term
    /// is not in the graph.
    pub fn messages_for_term(&self, label: &str) -> &[String] {
        self.node_by_label(label)
            .map(|n| n.message_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Edges touching the node with `id`.
    pub fn edges_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ClusterEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source_node_id == id || e.target_node_id == id)
    }
}
