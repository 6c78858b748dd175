//! chatgraph cluster crate - turns chat messages into a keyword graph.
//!
//! Provides the clustering pipeline:
//! - Tokenization with stopword filtering
//! - K-means over term feature vectors
//! - Graph construction with node capping and thresholded edges
//! - Whole-word highlighting of a node's term inside message text
//! - A generation-guarded slot holding the most recent graph

pub mod graph;
pub mod highlight;
pub mod kmeans;
pub mod snapshot;
pub mod tokenizer;
pub mod types;

pub use graph::{GraphBuilder, GraphReport};
pub use highlight::find_term_spans;
pub use kmeans::{kmeans, KMeansResult};
pub use snapshot::{GenerationCounter, LatestGraph};
pub use tokenizer::tokenize;
pub use types::{ClusterEdge, ClusterGraph, ClusterNode};
