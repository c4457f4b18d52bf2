//! Text embedding backends for the resume-advance scorer.
//!
//! `HashingEmbedder` is the built-in default: signed feature hashing of
//! lowercase word tokens, L2-normalized. It is deterministic across runs and
//! platforms, so a network trained on its output keeps working after restarts.
//!
//! Networks trained on all-MiniLM-L6-v2 sentence embeddings need
//! `MiniLmEmbedder`, which is only compiled with the `sentence-embeddings`
//! feature (it links libtorch through `rust-bert`).

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbedError {
    #[error("unknown embedder '{0}' (expected 'hashing' or 'minilm')")]
    UnknownKind(String),

    #[error("sentence embeddings need a build with the `sentence-embeddings` feature")]
    NotBuilt,

    #[error("sentence embedding backend failed: {0}")]
    Backend(String),
}

/// Pluggable text embedder. Carried by `ResumeAdvanceScorer` as `Arc<dyn TextEmbedder>`.
pub trait TextEmbedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Which embedder the advance network was trained against (`EMBEDDER`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbedderKind {
    #[default]
    Hashing,
    MiniLm,
}

impl FromStr for EmbedderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "hashing" => Ok(EmbedderKind::Hashing),
            "minilm" | "all-minilm-l6-v2" | "sbert" => Ok(EmbedderKind::MiniLm),
            other => Err(EmbedError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl TextEmbedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut out = vec![0.0_f32; self.dim];
        for token in tokens(text) {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dim as u64) as usize;
            // High bit picks the sign so collisions tend to cancel out.
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            out[bucket] += sign;
        }
        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// all-MiniLM-L6-v2 sentence embeddings
// ────────────────────────────────────────────────────────────────────────────

/// Output width of all-MiniLM-L6-v2.
#[cfg(feature = "sentence-embeddings")]
pub const MINILM_DIM: usize = 384;

#[cfg(feature = "sentence-embeddings")]
pub struct MiniLmEmbedder {
    model: std::sync::Mutex<rust_bert::pipelines::sentence_embeddings::SentenceEmbeddingsModel>,
}

#[cfg(feature = "sentence-embeddings")]
impl MiniLmEmbedder {
    /// Downloads (or reuses the cached) model weights. Blocking; call from
    /// `spawn_blocking`.
    pub fn load() -> Result<Self, EmbedError> {
        use rust_bert::pipelines::sentence_embeddings::{SentenceEmbeddingsBuilder, SentenceEmbeddingsModelType};

        let model = SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL6V2)
            .create_model()
            .map_err(|e| EmbedError::Backend(e.to_string()))?;
        Ok(Self {
            model: std::sync::Mutex::new(model),
        })
    }
}

#[cfg(feature = "sentence-embeddings")]
impl TextEmbedder for MiniLmEmbedder {
    fn dim(&self) -> usize {
        MINILM_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let model = self
            .model
            .lock()
            .map_err(|_| EmbedError::Backend("embedding model lock poisoned".to_string()))?;
        model
            .encode(&[text])
            .map_err(|e| EmbedError::Backend(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Backend("no embedding returned".to_string()))
    }
}

/// The MiniLM embedder, or `NotBuilt` when compiled without it.
pub fn mini_lm_embedder() -> Result<std::sync::Arc<dyn TextEmbedder>, EmbedError> {
    #[cfg(feature = "sentence-embeddings")]
    {
        Ok(std::sync::Arc::new(MiniLmEmbedder::load()?))
    }
    #[cfg(not(feature = "sentence-embeddings"))]
    {
        Err(EmbedError::NotBuilt)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// `a·b / (‖a‖‖b‖ + 1e-6)`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + 1e-6)
}
