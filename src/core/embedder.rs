//! Sentence embeddings for free-text answers
//!
//! [`SentenceEmbedder`] loads a BERT-family sentence-transformer with Candle
//! and mean-pools token states over the attention mask, the same pooling
//! sentence-transformers applies. [`HashingEmbedder`] is a lexical stand-in
//! that needs no model download.
//!
//! Both are loaded once per process and shared behind `Arc<dyn Embedder>`.
//! Inference takes `&self` and mutates no model state, so concurrent calls
//! need no lock.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Multilingual MiniLM (Korean-capable), BERT architecture
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Default dimension for the hashing embedder
pub const DEFAULT_HASHING_DIM: usize = 384;

/// Errors produced while loading or invoking an embedding model
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    Initialization(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Malformed embedding: expected {expected} dimensions, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Malformed embedding: non-finite component")]
    NonFinite,

    #[error("Embedding timed out after {0:?}")]
    Timeout(Duration),
}

impl EmbeddingError {
    pub fn initialization(msg: impl Display) -> Self {
        Self::Initialization(msg.to_string())
    }

    pub fn inference(msg: impl Display) -> Self {
        Self::Inference(msg.to_string())
    }
}

/// Text to fixed-length vector
pub trait Embedder: Send + Sync {
    /// Embed a single block of text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and health output
    fn model_name(&self) -> &str;
}

/// Where to fetch a sentence-transformer from
#[derive(Debug, Clone)]
pub struct ModelSource {
    /// HuggingFace Hub repository, e.g. `sentence-transformers/all-MiniLM-L6-v2`
    pub repo: String,
    pub revision: String,
    /// `model.safetensors` or a PyTorch `.bin` checkpoint
    pub weights_file: String,
    pub max_sequence_length: usize,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            repo: DEFAULT_MODEL_REPO.to_string(),
            revision: "main".to_string(),
            weights_file: "model.safetensors".to_string(),
            max_sequence_length: 256,
        }
    }
}

/// Sentence-transformer embedder running on Candle
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_name: String,
}

impl SentenceEmbedder {
    /// Download (or reuse the cached copy of) the model and load it on CPU
    ///
    /// Files are cached in the HuggingFace cache directory (~/.cache/huggingface).
    pub fn load(source: &ModelSource) -> Result<Self, EmbeddingError> {
        info!("Loading embedding model: {} ({})", source.repo, source.revision);

        let api = Api::new().map_err(EmbeddingError::initialization)?;
        let repo = api.repo(Repo::with_revision(
            source.repo.clone(),
            RepoType::Model,
            source.revision.clone(),
        ));

        let config_path = repo.get("config.json").map_err(EmbeddingError::initialization)?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(EmbeddingError::initialization)?;
        let weights_path = repo
            .get(&source.weights_file)
            .map_err(EmbeddingError::initialization)?;

        debug!("Model files resolved in cache");

        Self::from_files(&config_path, &tokenizer_path, &weights_path, source)
    }

    /// Load from files already on disk
    pub fn from_files(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        source: &ModelSource,
    ) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(config_path).map_err(EmbeddingError::initialization)?;
        let config: Config = serde_json::from_str(&raw_config).map_err(EmbeddingError::initialization)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(EmbeddingError::initialization)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: source.max_sequence_length,
                ..Default::default()
            }))
            .map_err(EmbeddingError::initialization)?;
        tokenizer.with_padding(None);

        let is_pytorch = weights_path
            .extension()
            .map_or(false, |ext| ext == "bin" || ext == "pt");
        let vb = if is_pytorch {
            VarBuilder::from_pth(weights_path, DTYPE, &device).map_err(EmbeddingError::initialization)?
        } else {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                    .map_err(EmbeddingError::initialization)?
            }
        };

        let model = BertModel::load(vb, &config).map_err(EmbeddingError::initialization)?;

        info!(
            "Embedding model loaded (hidden_size={}, max_sequence_length={})",
            config.hidden_size, source.max_sequence_length
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
            model_name: source.repo.clone(),
        })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(candle_core::Error::msg)?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        // (1, seq_len, hidden)
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        pooled.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.forward(text).map_err(EmbeddingError::inference)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Signed feature-hashing bag-of-words embedder
///
/// Tokens are lowercase alphanumeric runs; each lands in bucket
/// `fnv1a(token) % dimension` with a sign taken from the hash's top bit.
/// Deterministic across processes and platforms. Text with no tokens embeds
/// to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::initialization("hashing dimension must be positive"));
        }
        Ok(Self { dimension })
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIM,
        }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

#[inline]
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ *byte as u64).wrapping_mul(PRIME))
}
