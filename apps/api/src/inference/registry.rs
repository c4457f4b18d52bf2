//! Owns the configured model bundles and exposes the single
//! `predict(kind, raw_input)` entry point used by HTTP handlers and the assistant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::inference::advance::ResumeAdvanceScorer;
use crate::inference::bundle::{BundleError, ModelBundle};
use crate::inference::predictor::{predict_priority, predict_salary, PredictError, Prediction, PredictionKind};

pub struct ModelRegistry {
    salary_path: PathBuf,
    priority_path: PathBuf,
    advance_path: PathBuf,
    advance: Option<Arc<ResumeAdvanceScorer>>,
    /// `None` reloads bundles from disk on every call.
    cache: Option<Mutex<HashMap<PathBuf, Arc<ModelBundle>>>>,
}

impl ModelRegistry {
    pub fn new(salary_path: PathBuf, priority_path: PathBuf, advance_path: PathBuf, cache_bundles: bool) -> Self {
        Self {
            salary_path,
            priority_path,
            advance_path,
            advance: None,
            cache: cache_bundles.then(|| Mutex::new(HashMap::new())),
        }
    }

    /// Injects the resume-advance scorer built at startup.
    pub fn with_advance_scorer(mut self, scorer: ResumeAdvanceScorer) -> Self {
        self.advance = Some(Arc::new(scorer));
        self
    }

    pub fn advance_path(&self) -> &Path {
        &self.advance_path
    }

    /// Runs one prediction. `raw` must be a non-empty JSON object.
    pub fn predict(&self, kind: PredictionKind, raw: &Value) -> Result<Prediction, PredictError> {
        let input = raw
            .as_object()
            .filter(|m| !m.is_empty())
            .ok_or(PredictError::EmptyInput)?;

        let result = match kind {
            PredictionKind::Salary => predict_salary(&*self.bundle(&self.salary_path)?, input),
            PredictionKind::Priority => predict_priority(&*self.bundle(&self.priority_path)?, input),
            PredictionKind::ResumeAdvance => {
                let scorer = self.advance.as_ref().ok_or_else(|| BundleError::Unavailable {
                    path: self.advance_path.clone(),
                })?;
                scorer.predict(input)
            }
        };

        if let Err(PredictError::Inference { source, fallback }) = &result {
            warn!(
                "{kind:?} prediction failed: {source}{}",
                if fallback.is_some() { " (answering with fallback)" } else { "" }
            );
        }
        result
    }

    fn bundle(&self, path: &Path) -> Result<Arc<ModelBundle>, BundleError> {
        let Some(cache) = &self.cache else {
            return ModelBundle::load(path).map(Arc::new);
        };

        if let Some(bundle) = lock(cache).get(path) {
            debug!("Using cached bundle for {}", path.display());
            return Ok(Arc::clone(bundle));
        }
        // Load outside the lock; a concurrent first load of the same path is harmless.
        let bundle = Arc::new(ModelBundle::load(path)?);
        lock(cache).insert(path.to_path_buf(), Arc::clone(&bundle));
        Ok(bundle)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Cached bundles are immutable; a poisoned map is still consistent.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::embedding::HashingEmbedder;
    use crate::inference::testing::{advance_bundle_json, priority_bundle_json, salary_bundle_json, write_bundle};
    use serde_json::json;

    fn registry(dir: &Path, cache: bool) -> ModelRegistry {
        ModelRegistry::new(
            dir.join("salary.json"),
            dir.join("priority.json"),
            dir.join("advance.json"),
            cache,
        )
    }

    #[test]
    fn test_missing_model_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = registry(dir.path(), false)
            .predict(PredictionKind::Priority, &json!({ "years_experience": 3 }))
            .unwrap_err();
        assert!(matches!(err, PredictError::Load(BundleError::NotFound { .. })));
    }

    #[test]
    fn test_empty_input_rejected_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path(), false);
        assert!(matches!(
            reg.predict(PredictionKind::Salary, &json!({})),
            Err(PredictError::EmptyInput)
        ));
        assert!(matches!(
            reg.predict(PredictionKind::Salary, &json!([1, 2])),
            Err(PredictError::EmptyInput)
        ));
    }

    #[test]
    fn test_predicts_each_tabular_kind() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "salary.json", &salary_bundle_json());
        write_bundle(dir.path(), "priority.json", &priority_bundle_json());
        let reg = registry(dir.path(), false);

        let salary = reg
            .predict(PredictionKind::Salary, &json!({ "years_experience": 2, "role": "data" }))
            .unwrap();
        assert_eq!(serde_json::to_value(salary).unwrap(), json!({ "salary": "$84,000.00" }));

        let priority = reg
            .predict(PredictionKind::Priority, &json!({ "referral": "yes" }))
            .unwrap();
        assert_eq!(serde_json::to_value(priority).unwrap()["priority"], "High");
    }

    #[test]
    fn test_cache_keeps_serving_after_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(dir.path(), "salary.json", &salary_bundle_json());
        let reg = registry(dir.path(), true);
        let input = json!({ "years_experience": 1 });

        assert!(reg.predict(PredictionKind::Salary, &input).is_ok());
        std::fs::remove_file(path).unwrap();
        assert!(reg.predict(PredictionKind::Salary, &input).is_ok());

        let uncached = registry(dir.path(), false);
        assert!(uncached.predict(PredictionKind::Salary, &input).is_err());
    }

    #[test]
    fn test_advance_unavailable_until_injected() {
        let dir = tempfile::tempdir().unwrap();
        let input = json!({ "resume_text": "Python", "jd_text": "Python" });
        let err = registry(dir.path(), false)
            .predict(PredictionKind::ResumeAdvance, &input)
            .unwrap_err();
        assert!(matches!(err, PredictError::Load(BundleError::Unavailable { .. })));

        let scorer = ResumeAdvanceScorer::from_json(
            &advance_bundle_json(),
            Path::new("advance.json"),
            Arc::new(HashingEmbedder::new(8)),
        )
        .unwrap();
        let reg = registry(dir.path(), false).with_advance_scorer(scorer);
        assert!(reg.predict(PredictionKind::ResumeAdvance, &input).is_ok());
    }
}
