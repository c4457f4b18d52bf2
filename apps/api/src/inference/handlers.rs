use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::AppError;
use crate::inference::fit::{check_job_fit, JobFit};
use crate::inference::predictor::{PredictError, Prediction, PredictionKind};
use crate::inference::registry::ModelRegistry;
use crate::records::store::Collection;
use crate::records::{fetch_candidate, fetch_job};
use crate::state::AppState;

type Body = Result<Json<Value>, JsonRejection>;

fn input(body: Body) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|_| AppError::Validation("No input data provided".to_string()))
}

/// Runs a prediction on the blocking pool. The outer error is a scheduling
/// failure; the inner one is the prediction's own result.
pub async fn predict_off_thread(
    models: &Arc<ModelRegistry>,
    kind: PredictionKind,
    input: Value,
) -> Result<Result<Prediction, PredictError>, AppError> {
    let models = Arc::clone(models);
    tokio::task::spawn_blocking(move || models.predict(kind, &input))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("prediction task failed: {e}")))
}

/// Response body of a prediction. Success and fallback answers are both
/// bodies; a fallback also carries `"error"`.
pub fn prediction_body(result: Result<Prediction, PredictError>) -> Result<Value, AppError> {
    match result {
        Ok(prediction) => Ok(serde_json::to_value(prediction).map_err(anyhow::Error::from)?),
        Err(PredictError::Inference {
            source,
            fallback: Some(fallback),
        }) => {
            let mut body = serde_json::to_value(fallback).map_err(anyhow::Error::from)?;
            if let Value::Object(map) = &mut body {
                map.insert("error".to_string(), Value::String(source.to_string()));
            }
            Ok(body)
        }
        Err(e) => Err(e.into()),
    }
}

fn answer(result: Result<Prediction, PredictError>) -> Result<Json<Value>, AppError> {
    prediction_body(result).map(Json)
}

/// POST /api/salary/predict
pub async fn handle_predict_salary(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<Value>, AppError> {
    let input = input(body)?;
    answer(predict_off_thread(&state.models, PredictionKind::Salary, input).await?)
}

/// POST /api/candidate_priority/predict
///
/// When `candidate_id` names a stored candidate, the stored fields fill in
/// anything the request leaves out.
pub async fn handle_predict_priority(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<Value>, AppError> {
    let mut input = input(body)?;

    if let Some(request) = input.as_object() {
        if let Some(candidate_id) = request.get("candidate_id").and_then(Value::as_str) {
            if let Some(row) = state.store.get(Collection::Candidates, candidate_id).await? {
                debug!("Merging stored fields of candidate {candidate_id}");
                let mut merged: Map<String, Value> = match row.data {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                merged.extend(request.clone());
                input = Value::Object(merged);
            }
        }
    }

    answer(predict_off_thread(&state.models, PredictionKind::Priority, input).await?)
}

/// POST /api/resume_advance/predict
pub async fn handle_predict_resume_advance(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<Value>, AppError> {
    let input = input(body)?;
    answer(predict_off_thread(&state.models, PredictionKind::ResumeAdvance, input).await?)
}

/// POST /api/job_fit/predict
pub async fn handle_predict_job_fit(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<JobFit>, AppError> {
    let input = input(body)?;
    let field = |name: &str| input.get(name).and_then(Value::as_str).map(str::to_string);
    let (Some(candidate_id), Some(job_id)) = (field("candidate_id"), field("job_id")) else {
        return Err(AppError::Validation("candidate_id and job_id required".to_string()));
    };

    let candidate = fetch_candidate(state.store.as_ref(), &candidate_id).await?;
    let job = fetch_job(state.store.as_ref(), &job_id).await?;
    Ok(Json(check_job_fit(&candidate, &job)))
}
