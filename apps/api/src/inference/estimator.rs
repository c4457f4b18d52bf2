//! Pure-Rust evaluators for the estimators a model bundle can carry.
//!
//! Trees use the flat-array layout produced by common tree learners: node `i` has
//! `children_left[i]`, `children_right[i]`, `feature[i]`, `threshold[i]` and `value[i]`;
//! a child index of `-1` marks a leaf. A sample goes left when
//! `x[feature] <= threshold`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::embedding::EmbedError;

const LEAF: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("expected {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },

    #[error("feature '{column}' is not a finite number")]
    NonFinite { column: usize },

    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("model produced a non-finite output")]
    NonFiniteOutput,

    #[error("estimator is a {found}, expected a {expected}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("scaler expects {expected} features, got {found}")]
    ScalerShape { expected: usize, found: usize },

    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

// ────────────────────────────────────────────────────────────────────────────
// Estimator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    RandomForestClassifier(ForestClassifier),
    RandomForestRegressor(ForestRegressor),
    LinearRegression(LinearModel),
}

impl Estimator {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Estimator::RandomForestClassifier(_) => "classifier",
            Estimator::RandomForestRegressor(_) | Estimator::LinearRegression(_) => "regressor",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Estimator::RandomForestClassifier(f) => f.n_features,
            Estimator::RandomForestRegressor(f) => f.n_features,
            Estimator::LinearRegression(m) => m.coefficients.len(),
        }
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Estimator::RandomForestClassifier(f) => {
                if f.classes.is_empty() {
                    return Err("classifier has no classes".to_string());
                }
                validate_trees(&f.trees, f.n_features, Some(f.classes.len()))
            }
            Estimator::RandomForestRegressor(f) => validate_trees(&f.trees, f.n_features, None),
            Estimator::LinearRegression(m) => {
                if m.coefficients.is_empty() {
                    Err("linear model has no coefficients".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Regression output for a single sample.
    pub fn predict_value(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        let value = match self {
            Estimator::RandomForestRegressor(f) => f.predict(x)?,
            Estimator::LinearRegression(m) => m.predict(x)?,
            Estimator::RandomForestClassifier(_) => {
                return Err(EstimatorError::WrongKind {
                    expected: "regressor",
                    found: "classifier",
                })
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EstimatorError::NonFiniteOutput)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Random forests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    pub n_features: usize,
    /// Class value for each column of a leaf distribution.
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

/// A classifier's answer for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    pub class: i64,
    pub probabilities: Vec<f64>,
}

impl ForestClassifier {
    /// Mean of each tree's normalized leaf distribution.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        check_input(x, self.n_features)?;
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_value(x)?;
            let sum: f64 = leaf.iter().sum();
            if sum <= 0.0 {
                return Err(EstimatorError::MalformedTree(
                    "leaf distribution sums to zero".to_string(),
                ));
            }
            for (total, v) in totals.iter_mut().zip(leaf) {
                *total += v / sum;
            }
        }
        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }

    pub fn predict(&self, x: &[f64]) -> Result<ClassPrediction, EstimatorError> {
        let probabilities = self.predict_proba(x)?;
        // First maximum wins on ties.
        let best = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });
        Ok(ClassPrediction {
            class: self.classes[best],
            probabilities,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestRegressor {
    pub fn predict(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        check_input(x, self.n_features)?;
        let mut total = 0.0;
        for tree in &self.trees {
            let leaf = tree.leaf_value(x)?;
            total += leaf.first().copied().ok_or_else(|| {
                EstimatorError::MalformedTree("empty leaf value".to_string())
            })?;
        }
        Ok(total / self.trees.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize, n_outputs: Option<usize>) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays have different lengths".to_string());
        }
        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {i} has exactly one child"));
                }
                let width = self.value[i].len();
                match n_outputs {
                    Some(classes) if width != classes => {
                        return Err(format!(
                            "leaf {i} has {width} class weights, expected {classes}"
                        ))
                    }
                    None if width == 0 => return Err(format!("leaf {i} has no value")),
                    _ => {}
                }
                continue;
            }
            if !(0..n as i64).contains(&left) || !(0..n as i64).contains(&right) {
                return Err(format!("node {i} points outside the tree"));
            }
            if !(0..n_features as i64).contains(&self.feature[i]) {
                return Err(format!("node {i} splits on unknown feature {}", self.feature[i]));
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &[f64]) -> Result<&[f64], EstimatorError> {
        let mut node = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.node_count() {
            let left = self.children_left[node];
            if left == LEAF {
                return Ok(&self.value[node]);
            }
            let feature = self.feature[node] as usize;
            node = if x[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
        Err(EstimatorError::MalformedTree("cycle detected".to_string()))
    }
}

fn validate_trees(
    trees: &[DecisionTree],
    n_features: usize,
    n_outputs: Option<usize>,
) -> Result<(), String> {
    if trees.is_empty() {
        return Err("forest has no trees".to_string());
    }
    trees
        .iter()
        .enumerate()
        .try_for_each(|(i, t)| t.validate(n_features, n_outputs).map_err(|e| format!("tree {i}: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Linear model and scaler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn predict(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        check_input(x, self.coefficients.len())?;
        Ok(self.intercept + self.coefficients.iter().zip(x).map(|(c, v)| c * v).sum::<f64>())
    }
}

/// Standardizes each column as `(x - mean) / scale`. A zero scale leaves the
/// centered value unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        if self.mean.len() != x.len() || self.scale.len() != x.len() {
            return Err(EstimatorError::ScalerShape {
                expected: self.mean.len(),
                found: x.len(),
            });
        }
        Ok(x
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| if *s == 0.0 { v - m } else { (v - m) / s })
            .collect())
    }
}

fn check_input(x: &[f64], expected: usize) -> Result<(), EstimatorError> {
    if x.len() != expected {
        return Err(EstimatorError::FeatureCount {
            expected,
            found: x.len(),
        });
    }
    match x.iter().position(|v| !v.is_finite()) {
        Some(column) => Err(EstimatorError::NonFinite { column }),
        None => Ok(()),
    }
}
