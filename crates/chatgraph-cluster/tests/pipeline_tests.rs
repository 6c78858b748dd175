//! End-to-end tests for the message clustering pipeline.
//!
//! Each test builds its own `GraphBuilder`; TF-IDF builders are seeded so
//! k-means initialization is reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chatgraph_cluster::{
    find_term_spans, tokenize, GenerationCounter, GraphBuilder, LatestGraph,
};
use chatgraph_core::config::ClusteringConfig;
use chatgraph_core::types::{EdgeRule, Message};
use chatgraph_vector::{DynEmbeddingService, LazyEmbedder, MockEmbedding, Vectorizer};

// =============================================================================
// Helpers
// =============================================================================

fn messages(texts: &[&str]) -> Vec<Message> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Message::new(format!("m{}", i + 1), *t).with_author("tester"))
        .collect()
}

fn tfidf_builder(seed: u64) -> GraphBuilder {
    GraphBuilder::tfidf(ClusteringConfig {
        seed: Some(seed),
        ..ClusteringConfig::default()
    })
}

fn chat_log() -> Vec<Message> {
    messages(&[
        "The deploy pipeline failed again on staging",
        "Staging deploy needs a database migration first",
        "Who wants pizza for lunch today?",
        "Pizza sounds great, pepperoni please",
        "Migration script is ready, rerun the pipeline",
        "Lunch order placed, pepperoni and margherita pizza",
        "Database backups finished before the migration",
        "Coffee machine broken again",
        "Someone fix the coffee machine please",
        "Pipeline green on staging after migration",
    ])
}

fn term_map(graph: &chatgraph_cluster::ClusterGraph) -> BTreeMap<String, Vec<String>> {
    graph
        .nodes
        .iter()
        .map(|n| (n.label.clone(), n.message_ids.clone()))
        .collect()
}

// =============================================================================
// Graph invariants
// =============================================================================

#[tokio::test]
async fn test_three_message_example() {
    let builder = tfidf_builder(7);
    let graph = builder
        .build(&messages(&["the cat sat", "the dog ran", "cat and dog played"]), 2)
        .await;

    let labels: BTreeSet<&str> = graph.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(
        labels,
        BTreeSet::from(["cat", "sat", "dog", "ran", "played"])
    );

    let map = term_map(&graph);
    assert_eq!(map["cat"], vec!["m1", "m3"]);
    assert_eq!(map["sat"], vec!["m1"]);
    assert_eq!(map["dog"], vec!["m2", "m3"]);
    assert_eq!(map["ran"], vec!["m2"]);
    assert_eq!(map["played"], vec!["m3"]);

    let cat = graph.node_by_label("cat").unwrap();
    let dog = graph.node_by_label("dog").unwrap();
    assert!(graph.edges.iter().any(|e| {
        (e.source_node_id == cat.id && e.target_node_id == dog.id)
            || (e.source_node_id == dog.id && e.target_node_id == cat.id)
    }));
}

fn edge_between<'a>(
    graph: &'a chatgraph_cluster::ClusterGraph,
    a: &str,
    b: &str,
) -> Option<&'a chatgraph_cluster::ClusterEdge> {
    let a = &graph.node_by_label(a)?.id;
    let b = &graph.node_by_label(b)?.id;
    graph.edges.iter().find(|e| {
        (&e.source_node_id == a && &e.target_node_id == b)
            || (&e.source_node_id == b && &e.target_node_id == a)
    })
}

#[tokio::test]
async fn test_cooccurrence_links_terms_in_different_clusters() {
    let log = messages(&["the cat sat", "the dog ran", "cat and dog played"]);
    for seed in 0..20 {
        // Five distinct term vectors with k = 5 give every term its own cluster.
        let graph = tfidf_builder(seed).build(&log, 5).await;
        let cat = graph.node_by_label("cat").unwrap();
        let dog = graph.node_by_label("dog").unwrap();
        assert_ne!(cat.cluster_id, dog.cluster_id);

        let edge = edge_between(&graph, "cat", "dog").unwrap();
        assert!((edge.weight - 0.5).abs() < 1e-12);

        // Only pairs sharing a message exceed the 0.2 threshold.
        let mut linked: Vec<(String, String)> = graph
            .edges
            .iter()
            .map(|e| {
                let a = graph.node(&e.source_node_id).unwrap().label.clone();
                let b = graph.node(&e.target_node_id).unwrap().label.clone();
                if a < b { (a, b) } else { (b, a) }
            })
            .collect();
        linked.sort();
        let expected: Vec<(String, String)> = [
            ("cat", "dog"),
            ("cat", "played"),
            ("cat", "sat"),
            ("dog", "played"),
            ("dog", "ran"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        assert_eq!(linked, expected);
    }
}

#[tokio::test]
async fn test_no_edge_across_clusters_without_enough_cooccurrence() {
    let log = messages(&["the cat sat", "the dog ran", "cat and dog played"]);
    let graph = tfidf_builder(11).build(&log, 5).await;
    let sat = graph.node_by_label("sat").unwrap();
    let ran = graph.node_by_label("ran").unwrap();
    assert_ne!(sat.cluster_id, ran.cluster_id);
    assert!(edge_between(&graph, "sat", "ran").is_none());
    assert!(edge_between(&graph, "sat", "dog").is_none());

    // Co-occurrence equal to the threshold does not count.
    let builder = GraphBuilder::tfidf(ClusteringConfig {
        cooccurrence_threshold: 0.5,
        seed: Some(11),
        ..ClusteringConfig::default()
    });
    let graph = builder.build(&log, 5).await;
    assert_eq!(graph.nodes.len(), 5);
    assert!(graph.edges.is_empty());
}

#[tokio::test]
async fn test_node_cap_and_frequency_invariants() {
    let builder = tfidf_builder(3);
    let log = chat_log();
    let graph = builder.build(&log, 3).await;

    assert!(!graph.nodes.is_empty());
    assert!(graph.nodes.len() <= builder.config().max_nodes);

    let input_ids: BTreeSet<&str> = log.iter().map(|m| m.id.as_str()).collect();
    for node in &graph.nodes {
        assert_eq!(node.frequency, node.message_ids.len());
        assert!(!node.message_ids.is_empty());
        assert_eq!(node.first_message_id, node.message_ids[0]);
        assert!(node.cluster_id < 3);
        assert!(node
            .message_ids
            .iter()
            .all(|id| input_ids.contains(id.as_str())));
    }
}

#[tokio::test]
async fn test_edges_reference_nodes_and_have_valid_weights() {
    for seed in 0..10 {
        let graph = tfidf_builder(seed).build(&chat_log(), 3).await;
        let ids: BTreeSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut pairs = BTreeSet::new();
        for edge in &graph.edges {
            assert!(edge.weight > 0.0 && edge.weight <= 1.0);
            assert!(ids.contains(edge.source_node_id.as_str()));
            assert!(ids.contains(edge.target_node_id.as_str()));
            assert_ne!(edge.source_node_id, edge.target_node_id);
            let pair = if edge.source_node_id < edge.target_node_id {
                (edge.source_node_id.clone(), edge.target_node_id.clone())
            } else {
                (edge.target_node_id.clone(), edge.source_node_id.clone())
            };
            assert!(pairs.insert(pair), "duplicate edge between one node pair");
        }
    }
}

#[tokio::test]
async fn test_repeated_runs_keep_terms_and_frequencies() {
    let log = chat_log();
    let first = GraphBuilder::tfidf(ClusteringConfig::default())
        .build(&log, 3)
        .await;
    let second = GraphBuilder::tfidf(ClusteringConfig::default())
        .build(&log, 3)
        .await;

    assert_eq!(term_map(&first), term_map(&second));
    let freq = |g: &chatgraph_cluster::ClusterGraph| -> BTreeMap<String, usize> {
        g.nodes.iter().map(|n| (n.label.clone(), n.frequency)).collect()
    };
    assert_eq!(freq(&first), freq(&second));
}

#[tokio::test]
async fn test_separated_topics_share_clusters_across_runs() {
    // Two vocabularies that never share a message, so each topic's terms
    // get identical TF-IDF vectors.
    let log = messages(&[
        "kernel scheduler",
        "kernel scheduler",
        "garden tomato",
        "garden tomato",
    ]);

    let runs = 40;
    let mut consistent = 0;
    for seed in 0..runs {
        let graph = tfidf_builder(seed).build(&log, 2).await;
        let cluster = |label: &str| graph.node_by_label(label).unwrap().cluster_id;
        let tech = [cluster("kernel"), cluster("scheduler")];
        let garden = [cluster("garden"), cluster("tomato")];
        if tech[0] == tech[1] && garden[0] == garden[1] && tech[0] != garden[0] {
            consistent += 1;
        }
    }
    assert!(
        consistent * 100 >= runs * 95,
        "topics kept apart in only {consistent}/{runs} runs"
    );
}

#[tokio::test]
async fn test_empty_inputs() {
    let builder = tfidf_builder(1);
    assert!(builder.build(&[], 3).await.is_empty());
    let report = builder
        .build_report(&messages(&["ok", "a an it", "?!"]), 3)
        .await;
    assert!(report.graph.nodes.is_empty());
    assert!(report.graph.edges.is_empty());
}

#[tokio::test]
async fn test_k_larger_than_term_count() {
    let graph = tfidf_builder(1).build(&messages(&["solo"]), 10).await;
    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].cluster_id, 0);
    assert!(graph.edges.is_empty());
}

#[tokio::test]
async fn test_build_default_uses_configured_k() {
    let builder = GraphBuilder::tfidf(ClusteringConfig {
        k: 1,
        seed: Some(2),
        ..ClusteringConfig::default()
    });
    let graph = builder.build_default(&chat_log()).await;
    assert!(graph.nodes.iter().all(|n| n.cluster_id == 0));
    // One cluster under the OR rule joins every pair.
    let n = graph.nodes.len();
    assert_eq!(graph.edges.len(), n * (n - 1) / 2);
}

// =============================================================================
// Embedding strategy
// =============================================================================

#[tokio::test]
async fn test_embedding_strategy_with_mock_provider() {
    let embedder = Arc::new(LazyEmbedder::new(|| {
        Ok(Arc::new(MockEmbedding::new()) as Arc<dyn DynEmbeddingService>)
    }));
    let builder = GraphBuilder::new(
        ClusteringConfig {
            seed: Some(5),
            ..ClusteringConfig::default()
        },
        Vectorizer::Embedding {
            embedder: Arc::clone(&embedder),
            fallback_dimensions: 384,
            fallback_range: 0.5,
        },
    );
    assert_eq!(builder.edge_rule(), EdgeRule::ClusterAndSimilarity);
    assert!(!embedder.is_initialized());

    let report = builder.build_report(&chat_log(), 3).await;
    assert!(!report.degraded);
    assert!(embedder.is_initialized());
    for node in &report.graph.nodes {
        assert_eq!(node.vector.len(), 384);
    }
    for edge in &report.graph.edges {
        let a = report.graph.node(&edge.source_node_id).unwrap();
        let b = report.graph.node(&edge.target_node_id).unwrap();
        assert_eq!(a.cluster_id, b.cluster_id);
        assert!(edge.weight > 0.5 && edge.weight <= 1.0);
    }
}

// =============================================================================
// Snapshots and highlighting
// =============================================================================

#[tokio::test]
async fn test_out_of_order_builds_keep_newest_graph() {
    let counter = GenerationCounter::new();
    let latest = LatestGraph::new();
    let builder = tfidf_builder(9);

    let older = messages(&["first snapshot words"]);
    let newer = messages(&["first snapshot words", "second snapshot arrives"]);
    let old_generation = counter.next();
    let new_generation = counter.next();

    let new_graph = builder.build(&newer, 2).await;
    let old_graph = builder.build(&older, 2).await;

    assert!(latest.publish(new_generation, new_graph));
    assert!(!latest.publish(old_generation, old_graph));

    let (generation, graph) = latest.get();
    assert_eq!(generation, new_generation);
    assert!(graph.node_by_label("arrives").is_some());
}

#[tokio::test]
async fn test_node_messages_can_be_highlighted() {
    let log = chat_log();
    let graph = tfidf_builder(4).build(&log, 3).await;
    let node = graph.node_by_label("pipeline").unwrap();

    for id in graph.messages_for_term("pipeline") {
        let message = log.iter().find(|m| &m.id == id).unwrap();
        assert!(!find_term_spans(&message.text, &node.label).is_empty());
        assert!(tokenize(&message.text).contains(&node.label));
    }
}
