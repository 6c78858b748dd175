//! CLI argument definitions for the chatgraph binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use chatgraph_core::config::ChatGraphConfig;
use chatgraph_core::types::VectorStrategy;
use clap::Parser;

/// chatgraph: cluster the keywords of a chat history into a graph.
#[derive(Parser, Debug)]
#[command(name = "chatgraph", version, about)]
pub struct CliArgs {
    /// JSON file holding an array of messages, or `-` for stdin.
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Number of k-means clusters.
    #[arg(short = 'k', long = "k")]
    pub k: Option<usize>,

    /// Vectorization strategy (tfidf, embedding).
    #[arg(short = 's', long = "strategy", value_parser = parse_strategy)]
    pub strategy: Option<VectorStrategy>,

    /// Maximum number of nodes in the output graph.
    #[arg(short = 'n', long = "max-nodes")]
    pub max_nodes: Option<usize>,

    /// Seed for reproducible clustering.
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Directory holding model.onnx and tokenizer.json.
    #[arg(short = 'm', long = "model-dir")]
    pub model_dir: Option<PathBuf>,

    /// Pretty-print the output JSON.
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CHATGRAPH_CONFIG env var > ~/.chatgraph/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CHATGRAPH_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter directive.
    ///
    /// Priority: --log-level flag > config file value. `RUST_LOG` is checked
    /// by the subscriber before either.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Reads from stdin when the input path is `-`.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ChatGraphConfig) {
        if let Some(k) = self.k {
            config.clustering.k = k;
        }
        if let Some(strategy) = self.strategy {
            config.clustering.strategy = strategy;
        }
        if let Some(max_nodes) = self.max_nodes {
            config.clustering.max_nodes = max_nodes;
        }
        if let Some(seed) = self.seed {
            config.clustering.seed = Some(seed);
        }
        if let Some(ref dir) = self.model_dir {
            config.embedding.model_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

fn parse_strategy(s: &str) -> Result<VectorStrategy, String> {
    VectorStrategy::parse(s)
        .ok_or_else(|| format!("unknown strategy '{}', expected tfidf or embedding", s))
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".chatgraph").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
