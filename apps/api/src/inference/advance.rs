//! Resume-advance scorer: estimates the probability that a resume advances
//! past screening for a given job description.
//!
//! Network input, in order:
//!   resume embedding ‖ JD embedding ‖ job-family one-hot ‖ seniority one-hot
//!   ‖ [years of experience, skill overlap] ‖ [cosine(resume, JD)]
//!
//! The cosine similarity is computed here and fed to the network as an
//! explicit feature. Only inference lives here; training happens offline.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::inference::bundle::{read_bundle_file, BundleError};
use crate::inference::embedding::{cosine_similarity, mini_lm_embedder, EmbedderKind, HashingEmbedder, TextEmbedder};
use crate::inference::estimator::EstimatorError;
use crate::inference::normalizer::FeatureRecord;
use crate::inference::predictor::{AdvancePrediction, PredictError, Prediction};

pub const DEFAULT_SKILLS: [&str; 7] = ["Python", "AWS", "DevOps", "QA", "Frontend", "Backend", "PM"];

/// Number of hand-engineered numeric features (years, overlap).
const NUMERIC_FEATURES: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Feed-forward network
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Identity,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Identity => x,
        }
    }
}

/// Dense layer; `weights` is `[out][in]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedForward {
    pub layers: Vec<DenseLayer>,
}

impl FeedForward {
    fn validate(&self, input_dim: usize) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".to_string());
        }
        let mut width = input_dim;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() || layer.weights.len() != layer.bias.len() {
                return Err(format!("layer {i}: weights and bias disagree"));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(format!(
                    "layer {i}: expects {} inputs, previous width is {width}",
                    row.len()
                ));
            }
            width = layer.weights.len();
        }
        if width != 1 {
            return Err(format!("network must have one output, has {width}"));
        }
        Ok(())
    }

    /// Dropout layers are identity at inference and are not represented.
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.layers.iter().fold(input.to_vec(), |x, layer| {
            layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, b)| {
                    let z = row.iter().zip(&x).map(|(w, v)| w * v).sum::<f32>() + b;
                    layer.activation.apply(z)
                })
                .collect()
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bundle + input
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AdvanceBundle {
    pub embedding_dim: usize,
    pub job_families: Vec<String>,
    pub seniorities: Vec<String>,
    #[serde(default = "default_skills")]
    pub skills: Vec<String>,
    pub network: FeedForward,
}

fn default_skills() -> Vec<String> {
    DEFAULT_SKILLS.iter().map(|s| (*s).to_string()).collect()
}

impl AdvanceBundle {
    pub fn input_dim(&self) -> usize {
        2 * self.embedding_dim + self.job_families.len() + self.seniorities.len() + NUMERIC_FEATURES + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceInput {
    pub resume_text: String,
    pub jd_text: String,
    pub job_family: Option<String>,
    pub seniority: Option<String>,
}

impl AdvanceInput {
    /// Both texts are required and must be non-blank.
    pub fn from_record(raw: &FeatureRecord) -> Result<Self, PredictError> {
        let text = |keys: &[&str]| -> Result<String, PredictError> {
            keys.iter()
                .find_map(|k| raw.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| PredictError::missing(keys[0]))
        };
        let optional = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(AdvanceInput {
            resume_text: text(&["resume_text", "resume_text_256"])?,
            jd_text: text(&["jd_text", "jd_text_128"])?,
            job_family: optional("job_family"),
            seniority: optional("seniority"),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer
// ────────────────────────────────────────────────────────────────────────────

/// A loaded advance model with its embedder. Built once at startup and shared.
pub struct ResumeAdvanceScorer {
    bundle: AdvanceBundle,
    embedder: Arc<dyn TextEmbedder>,
}

impl ResumeAdvanceScorer {
    /// Loads the bundle at `path` with the embedder it was trained against.
    /// Blocking: MiniLM weights may be downloaded on first use.
    pub fn load(path: &Path, kind: EmbedderKind) -> Result<Self, BundleError> {
        match kind {
            EmbedderKind::Hashing => Self::load_with_hashing_embedder(path),
            EmbedderKind::MiniLm => Self::load_with_embedder(path, mini_lm_embedder()?),
        }
    }

    pub fn load_with_embedder(path: &Path, embedder: Arc<dyn TextEmbedder>) -> Result<Self, BundleError> {
        let text = read_bundle_file(path)?;
        let scorer = Self::from_json(&text, path, embedder)?;
        info!(
            "Loaded resume-advance network from {} ({} inputs, {}-dim sentence embeddings)",
            path.display(),
            scorer.bundle.input_dim(),
            scorer.bundle.embedding_dim
        );
        Ok(scorer)
    }

    /// Loads a bundle paired with a `HashingEmbedder` sized to the bundle's
    /// `embedding_dim`.
    pub fn load_with_hashing_embedder(path: &Path) -> Result<Self, BundleError> {
        #[derive(Deserialize)]
        struct Header {
            embedding_dim: usize,
        }

        let text = read_bundle_file(path)?;
        let header: Header = serde_json::from_str(&text).map_err(|source| BundleError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        let scorer = Self::from_json(&text, path, Arc::new(HashingEmbedder::new(header.embedding_dim)))?;
        info!(
            "Loaded resume-advance network from {} ({} inputs, hashing embedder)",
            path.display(),
            scorer.bundle.input_dim()
        );
        Ok(scorer)
    }

    pub fn from_json(
        text: &str,
        origin: &Path,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self, BundleError> {
        let bundle: AdvanceBundle = serde_json::from_str(text).map_err(|source| BundleError::Format {
            path: origin.to_path_buf(),
            source,
        })?;
        let invalid = |reason: String| BundleError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };
        if embedder.dim() != bundle.embedding_dim {
            return Err(invalid(format!(
                "embedder produces {} dims, bundle expects {}",
                embedder.dim(),
                bundle.embedding_dim
            )));
        }
        bundle.network.validate(bundle.input_dim()).map_err(invalid)?;
        Ok(Self { bundle, embedder })
    }

    pub fn input_dim(&self) -> usize {
        self.bundle.input_dim()
    }

    pub fn feature_vector(&self, input: &AdvanceInput) -> Result<Vec<f32>, EstimatorError> {
        let resume = self.embedder.embed(&input.resume_text)?;
        let jd = self.embedder.embed(&input.jd_text)?;
        let cos = cosine_similarity(&resume, &jd);

        let mut x = Vec::with_capacity(self.input_dim());
        x.extend_from_slice(&resume);
        x.extend_from_slice(&jd);
        x.extend(one_hot(&self.bundle.job_families, input.job_family.as_deref()));
        x.extend(one_hot(&self.bundle.seniorities, input.seniority.as_deref()));
        x.push(extract_years(&input.resume_text) as f32);
        x.push(skill_overlap(&input.resume_text, &input.jd_text, &self.bundle.skills));
        x.push(cos);
        Ok(x)
    }

    /// Advancement probability in `[0, 1]`.
    pub fn score(&self, input: &AdvanceInput) -> Result<f64, EstimatorError> {
        let output = self.bundle.network.forward(&self.feature_vector(input)?);
        match output.first() {
            Some(p) if p.is_finite() => Ok(f64::from(p.clamp(0.0, 1.0))),
            _ => Err(EstimatorError::NonFiniteOutput),
        }
    }

    pub fn predict(&self, raw: &FeatureRecord) -> Result<Prediction, PredictError> {
        let input = AdvanceInput::from_record(raw)?;
        let p = self.score(&input).map_err(|source| PredictError::Inference {
            source,
            fallback: None,
        })?;
        Ok(Prediction::ResumeAdvance(AdvancePrediction::from_probability(p)))
    }
}

/// Unknown or missing categories encode as all zeros.
fn one_hot(categories: &[String], value: Option<&str>) -> Vec<f32> {
    categories
        .iter()
        .map(|c| if Some(c.as_str()) == value { 1.0 } else { 0.0 })
        .collect()
}

/// First `N years` / `N+ years` mention in the text, else 0.
pub fn extract_years(text: &str) -> u32 {
    static YEARS: OnceLock<Regex> = OnceLock::new();
    let re = YEARS.get_or_init(|| Regex::new(r"(\d+)\+?\s*years").expect("static regex"));
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Share of the JD's known skills that the resume also mentions.
pub fn skill_overlap(resume: &str, jd: &str, skills: &[String]) -> f32 {
    let resume = resume.to_lowercase();
    let jd = jd.to_lowercase();
    let mentioned = |text: &str, skill: &str| text.contains(&skill.to_lowercase());

    let jd_skills: Vec<&String> = skills.iter().filter(|s| mentioned(&jd, s)).collect();
    let shared = jd_skills.iter().filter(|s| mentioned(&resume, s)).count();
    shared as f32 / (jd_skills.len() as f32 + 1e-6)
}
