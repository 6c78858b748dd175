//! chatgraph binary - composition root.
//!
//! 1. Parse arguments and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Read the message array (file or stdin)
//! 4. Build the keyword graph with the configured strategy
//! 5. Print the graph as JSON on stdout

mod cli;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use chatgraph_cluster::GraphBuilder;
use chatgraph_core::config::ChatGraphConfig;
use chatgraph_core::types::{Message, VectorStrategy};
use chatgraph_core::{ChatGraphError, Result};
use chatgraph_vector::{LazyEmbedder, Vectorizer};

use cli::{expand_home, CliArgs};

/// Load the config file. A missing or broken default file falls back to
/// defaults; a file named with `--config` must load.
fn load_config(args: &CliArgs) -> Result<(ChatGraphConfig, Option<String>)> {
    let path = args.resolve_config_path();
    match ChatGraphConfig::load(&path) {
        Ok(config) => Ok((config, None)),
        Err(e) if args.config.is_some() => Err(e),
        Err(e) => Ok((
            ChatGraphConfig::default(),
            path.exists()
                .then(|| format!("Failed to load config from {}: {}", path.display(), e)),
        )),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn read_messages(args: &CliArgs) -> Result<Vec<Message>> {
    let content = if args.reads_stdin() {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)?
    };
    let messages: Vec<Message> = serde_json::from_str(&content)?;
    Ok(messages)
}

fn vectorizer_for(config: &ChatGraphConfig) -> Vectorizer {
    match config.clustering.strategy {
        VectorStrategy::Tfidf => Vectorizer::TfIdf,
        VectorStrategy::Embedding => {
            let model_dir = expand_home(&config.embedding.model_dir);
            tracing::info!(path = %model_dir.display(), "Embedding model will load on first use");
            Vectorizer::embedding(
                Arc::new(LazyEmbedder::onnx(model_dir)),
                &config.embedding,
            )
        }
    }
}

fn input_label(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let (mut config, load_warning) = load_config(&args)?;
    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::debug!("Starting chatgraph v{}", env!("CARGO_PKG_VERSION"));
    if let Some(warning) = load_warning {
        tracing::warn!("{}. Using defaults.", warning);
    }

    args.apply_overrides(&mut config);
    config.validate()?;

    let messages = read_messages(&args).map_err(|e| {
        tracing::error!(input = %input_label(&args.input), error = %e, "Failed to read messages");
        e
    })?;
    tracing::info!(
        messages = messages.len(),
        input = %input_label(&args.input),
        "Messages loaded"
    );

    let k = config.clustering.k;
    let builder = GraphBuilder::new(config.clustering.clone(), vectorizer_for(&config));
    let report = builder.build_report(&messages, k).await;

    if report.degraded {
        tracing::warn!(
            strategy = report.strategy.as_str(),
            "Embedding model unavailable; graph built from random vectors"
        );
    }
    tracing::info!(
        nodes = report.graph.nodes.len(),
        edges = report.graph.edges.len(),
        terms = report.term_count,
        iterations = report.kmeans_iterations,
        "Graph ready"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&report.graph)
    } else {
        serde_json::to_string(&report.graph)
    }
    .map_err(ChatGraphError::from)?;
    println!("{}", json);

    Ok(())
}
