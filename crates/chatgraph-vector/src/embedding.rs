//! Embedding providers for the dense vectorization strategy.
//!
//! - `OnnxEmbeddingService` runs a sentence-transformer export (such as
//!   all-MiniLM-L6-v2) through ort, tokenizing with HuggingFace tokenizers.
//! - `MockEmbedding` hashes text into unit vectors, for tests and benches.
//! - `LazyEmbedder` owns the process-wide model handle: it runs a loader once,
//!   on first use, and hands the same service to every later caller.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chatgraph_core::error::{ChatGraphError, Result};
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Turns a piece of text into a dense vector.
///
/// Implementations convert text into fixed-dimensional, L2-normalized vectors.
pub trait EmbeddingService: Send + Sync {
    /// Embed `text`. Fails on empty input or a provider error.
    fn embed(&self, text: &str) -> impl std::future::Future<Output = Result<Vec<f32>>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future` and so is not object-safe;
/// this trait boxes the future instead. Every `EmbeddingService` gets it
/// through the blanket impl below.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - sentence-transformer inference through ONNX Runtime
// ---------------------------------------------------------------------------

/// Embedding provider backed by a sentence-transformer ONNX export.
///
/// The model directory holds `model.onnx` and the HuggingFace
/// `tokenizer.json`. Token embeddings are averaged over the attention mask
/// and the result is L2-normalized. Cloning shares the loaded model.
#[derive(Clone)]
pub struct OnnxEmbeddingService {
    model: Arc<OnnxModel>,
}

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

// ort::Session is Send + Sync internally (uses Arc<SharedSessionInner>).
unsafe impl Send for OnnxModel {}
unsafe impl Sync for OnnxModel {}

/// Model inputs for one text, each shaped `[1, seq_len]`.
struct EncodedText {
    input_ids: ndarray::Array2<i64>,
    attention_mask: ndarray::Array2<i64>,
    token_type_ids: ndarray::Array2<i64>,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.model.dimensions)
            .finish()
    }
}

fn onnx_error(context: &str, e: impl std::fmt::Display) -> ChatGraphError {
    ChatGraphError::Embedding(format!("{}: {}", context, e))
}

impl OnnxEmbeddingService {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn from_directory(model_dir: &Path) -> Result<Self> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )
    }

    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        for (what, path) in [("ONNX model", model_path), ("Tokenizer", tokenizer_path)] {
            if !path.exists() {
                return Err(ChatGraphError::Embedding(format!(
                    "{} not found at {}",
                    what,
                    path.display()
                )));
            }
        }

        let session = Session::builder()
            .map_err(|e| onnx_error("ONNX session builder", e))?
            .with_intra_threads(1)
            .map_err(|e| onnx_error("ONNX intra-op threads", e))?
            .commit_from_file(model_path)
            .map_err(|e| onnx_error("ONNX model load", e))?;

        // Output 0 is [batch, seq_len, hidden]; fall back to MiniLM's width.
        let dimensions = session
            .outputs()
            .first()
            .and_then(|output| output.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .filter(|&hidden| hidden > 0)
            .map_or(384, |hidden| hidden as usize);

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| onnx_error("Tokenizer load", e))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Embedding model loaded"
        );

        Ok(Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimensions,
            }),
        })
    }
}

impl OnnxModel {
    fn encode(&self, text: &str) -> Result<EncodedText> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| onnx_error("Tokenization", e))?;

        let row = |values: &[u32]| {
            let values: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
            ndarray::Array2::from_shape_vec((1, values.len()), values)
                .map_err(|e| onnx_error("Input shape", e))
        };

        Ok(EncodedText {
            input_ids: row(encoding.get_ids())?,
            attention_mask: row(encoding.get_attention_mask())?,
            token_type_ids: row(encoding.get_type_ids())?,
        })
    }

    /// Blocking inference for one text.
    fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(ChatGraphError::Embedding("Cannot embed empty text".to_string()));
        }
        let encoded = self.encode(text)?;

        let ids = TensorRef::from_array_view(&encoded.input_ids)
            .map_err(|e| onnx_error("input_ids tensor", e))?;
        let mask = TensorRef::from_array_view(&encoded.attention_mask)
            .map_err(|e| onnx_error("attention_mask tensor", e))?;
        let types = TensorRef::from_array_view(&encoded.token_type_ids)
            .map_err(|e| onnx_error("token_type_ids tensor", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| onnx_error("ONNX session lock", e))?;
        let outputs = session
            .run(ort::inputs![ids, mask, types])
            .map_err(|e| onnx_error("ONNX inference", e))?;
        let (shape, tokens) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| onnx_error("ONNX output", e))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let hidden = match dims.last() {
            Some(&hidden) if hidden > 0 => hidden as usize,
            _ => {
                return Err(ChatGraphError::Embedding(format!(
                    "Unexpected ONNX output shape: {:?}",
                    dims
                )))
            }
        };

        let token_mask: Vec<i64> = encoded.attention_mask.iter().copied().collect();
        let mut pooled = mean_pool(tokens, &token_mask, hidden);
        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

/// Average the `hidden`-wide token rows of `tokens` whose mask entry is set.
fn mean_pool(tokens: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let rows = tokens.chunks_exact(hidden).zip(mask).filter(|(_, &m)| m > 0);
    let mut count = 0usize;
    for (row, _) in rows {
        for (slot, value) in pooled.iter_mut().zip(row) {
            *slot += value;
        }
        count += 1;
    }
    if count > 0 {
        let count = count as f32;
        pooled.iter_mut().for_each(|v| *v /= count);
    }
    pooled
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .map_err(|e| onnx_error("Embedding task panicked", e))?
    }

    fn dimensions(&self) -> usize {
        self.model.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result: Vec<f32> = (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                (((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0) as f32
            })
            .collect();
        l2_normalize(&mut result);
        result
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(ChatGraphError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in values {
            *val /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// LazyEmbedder - single-initialization handle around a provider
// ---------------------------------------------------------------------------

type Loader = dyn Fn() -> Result<Arc<dyn DynEmbeddingService>> + Send + Sync;

/// Lazily-initialized embedding provider shared for the process lifetime.
///
/// The loader runs on a blocking thread the first time [`LazyEmbedder::get`]
/// is awaited. Concurrent callers wait on that same in-flight load. Once a
/// load succeeds the service is cached and the loader never runs again; a
/// failed load leaves the handle empty so the next call retries.
pub struct LazyEmbedder {
    loader: Arc<Loader>,
    cell: OnceCell<Arc<dyn DynEmbeddingService>>,
}

impl std::fmt::Debug for LazyEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEmbedder")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl LazyEmbedder {
    /// Wrap an arbitrary loader.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn DynEmbeddingService>> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Loader for an ONNX model directory (`model.onnx` + `tokenizer.json`).
    pub fn onnx(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        Self::new(move || {
            let service = OnnxEmbeddingService::from_directory(&model_dir)?;
            Ok(Arc::new(service) as Arc<dyn DynEmbeddingService>)
        })
    }

    /// Handle that is already initialized with `service`.
    pub fn ready(service: Arc<dyn DynEmbeddingService>) -> Self {
        let cell = OnceCell::new();
        // A fresh cell cannot already be set.
        let _ = cell.set(Arc::clone(&service));
        Self {
            loader: Arc::new(move || Ok(Arc::clone(&service))),
            cell,
        }
    }

    /// The provider, loading it on first use.
    pub async fn get(&self) -> Result<Arc<dyn DynEmbeddingService>> {
        let service = self
            .cell
            .get_or_try_init(|| async {
                debug!("Initializing embedding provider");
                let loader = Arc::clone(&self.loader);
                tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| {
                        ChatGraphError::Embedding(format!("Embedding loader panicked: {}", e))
                    })?
            })
            .await?;
        Ok(Arc::clone(service))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
