//! Runs a bundle's estimator on a normalized vector and shapes the answer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::bundle::{BundleError, ModelBundle};
use crate::inference::estimator::{Estimator, EstimatorError};
use crate::inference::normalizer::{normalize, FeatureProfile, FeatureRecord};

pub const DEFAULT_PRIORITY_LABEL: &str = "Medium";
pub const ADVANCE_THRESHOLD: f64 = 0.5;

const DEFAULT_PRIORITY_LABELS: [(i64, &str); 3] = [(0, "Low"), (1, "Medium"), (2, "High")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    Salary,
    Priority,
    ResumeAdvance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryEstimate {
    pub salary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityPrediction {
    pub priority: String,
    pub confidence: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub probabilities: BTreeMap<String, String>,
}

impl PriorityPrediction {
    /// The answer given when the model could not produce one.
    pub fn fallback() -> Self {
        Self {
            priority: DEFAULT_PRIORITY_LABEL.to_string(),
            confidence: "0%".to_string(),
            probabilities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancePrediction {
    pub advance_probability: f64,
    pub likely_to_advance: bool,
}

impl AdvancePrediction {
    pub fn from_probability(p: f64) -> Self {
        let p = p.clamp(0.0, 1.0);
        Self {
            advance_probability: p,
            likely_to_advance: p >= ADVANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Salary(SalaryEstimate),
    Priority(PriorityPrediction),
    ResumeAdvance(AdvancePrediction),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Load(#[from] BundleError),

    #[error("no input data provided")]
    EmptyInput,

    #[error("missing or invalid field '{field}'")]
    Validation { field: String },

    /// The model failed on this input. `fallback` carries the safe default for
    /// prediction kinds that have one.
    #[error("prediction failed: {source}")]
    Inference {
        #[source]
        source: EstimatorError,
        fallback: Option<Prediction>,
    },
}

impl PredictError {
    pub fn missing(field: &str) -> Self {
        PredictError::Validation {
            field: field.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Salary
// ────────────────────────────────────────────────────────────────────────────

/// Regression bundles answer with a currency amount; a classifier bundle's
/// label passes through as-is.
pub fn predict_salary(bundle: &ModelBundle, raw: &FeatureRecord) -> Result<Prediction, PredictError> {
    let vector = normalize(raw, bundle, FeatureProfile::Tabular);
    let inference_failed = |source| PredictError::Inference {
        source,
        fallback: None,
    };

    let salary = match &bundle.estimator {
        Estimator::RandomForestClassifier(forest) => {
            let pred = forest.predict(&vector.values).map_err(inference_failed)?;
            bundle
                .label_map
                .as_ref()
                .and_then(|labels| labels.get(&pred.class).cloned())
                .unwrap_or_else(|| pred.class.to_string())
        }
        estimator => format_currency(estimator.predict_value(&vector.values).map_err(inference_failed)?),
    };

    Ok(Prediction::Salary(SalaryEstimate { salary }))
}

/// `$1,234,567.89`; negative amounts as `-$12.50`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

// ────────────────────────────────────────────────────────────────────────────
// Priority
// ────────────────────────────────────────────────────────────────────────────

pub fn predict_priority(bundle: &ModelBundle, raw: &FeatureRecord) -> Result<Prediction, PredictError> {
    let inference_failed = |source| PredictError::Inference {
        source,
        fallback: Some(Prediction::Priority(PriorityPrediction::fallback())),
    };

    let forest = match &bundle.estimator {
        Estimator::RandomForestClassifier(forest) => forest,
        other => {
            return Err(inference_failed(EstimatorError::WrongKind {
                expected: "classifier",
                found: other.kind_name(),
            }))
        }
    };

    let vector = normalize(raw, bundle, FeatureProfile::CandidatePriority);
    let pred = forest.predict(&vector.values).map_err(inference_failed)?;

    let mapped_label = |class: i64| -> Option<String> {
        match &bundle.label_map {
            Some(labels) => labels.get(&class).cloned(),
            None => DEFAULT_PRIORITY_LABELS
                .iter()
                .find(|(c, _)| *c == class)
                .map(|(_, label)| (*label).to_string()),
        }
    };

    // Unmapped classes keep their raw value in the breakdown so no entry is
    // overwritten by the default label.
    let confidence = pred.probabilities.iter().copied().fold(0.0_f64, f64::max);
    let probabilities = forest
        .classes
        .iter()
        .zip(&pred.probabilities)
        .map(|(class, p)| {
            let key = mapped_label(*class).unwrap_or_else(|| class.to_string());
            (key, format_percent(*p))
        })
        .collect();

    Ok(Prediction::Priority(PriorityPrediction {
        priority: mapped_label(pred.class).unwrap_or_else(|| DEFAULT_PRIORITY_LABEL.to_string()),
        confidence: format_percent(confidence),
        probabilities,
    }))
}

fn format_percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
