use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::records::store::Collection;
use crate::state::AppState;

type Body = Result<Json<Value>, JsonRejection>;

/// Non-empty JSON object body, or 400.
fn object_body(body: Body) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(Value::Object(map))) if !map.is_empty() => Ok(map),
        _ => Err(AppError::Validation("No JSON data provided".to_string())),
    }
}

/// Reads the business key out of a new document. Numbers are accepted and
/// stored as strings.
fn document_key(collection: Collection, doc: &Map<String, Value>) -> Result<String, AppError> {
    let field = collection.key_field();
    match doc.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

async fn list(state: AppState, collection: Collection) -> Result<Json<Vec<Value>>, AppError> {
    let rows = state.store.list(collection).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_document()).collect()))
}

async fn get(state: AppState, collection: Collection, key: String) -> Result<Json<Value>, AppError> {
    let row = state
        .store
        .get(collection, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", collection.label())))?;
    Ok(Json(row.into_document()))
}

async fn create(
    state: AppState,
    collection: Collection,
    body: Body,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut doc = object_body(body)?;
    let key = document_key(collection, &doc)?;
    doc.insert(collection.key_field().to_string(), Value::String(key.clone()));

    let id = state.store.insert(collection, &key, Value::Object(doc)).await?;
    info!("Created {} {key}", collection.label().to_lowercase());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} created", collection.label()),
            "id": id,
            collection.key_field(): key,
        })),
    ))
}

async fn update(
    state: AppState,
    collection: Collection,
    key: String,
    body: Body,
) -> Result<Json<Value>, AppError> {
    let mut patch = object_body(body)?;
    // The key is immutable once stored.
    patch.remove(collection.key_field());

    if !state.store.update(collection, &key, patch).await? {
        return Err(AppError::NotFound(format!("{} not found", collection.label())));
    }
    Ok(Json(json!({ "message": format!("{} updated", collection.label()) })))
}

async fn delete(state: AppState, collection: Collection, key: String) -> Result<Json<Value>, AppError> {
    if !state.store.delete(collection, &key).await? {
        return Err(AppError::NotFound(format!("{} not found", collection.label())));
    }
    info!("Deleted {} {key}", collection.label().to_lowercase());
    Ok(Json(json!({ "message": format!("{} deleted", collection.label()) })))
}

// ────────────────────────────────────────────────────────────────────────────
// Candidates
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/candidates
pub async fn handle_list_candidates(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    list(state, Collection::Candidates).await
}

/// POST /api/candidates
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create(state, Collection::Candidates, body).await
}

/// GET /api/candidate/:candidate_id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    get(state, Collection::Candidates, candidate_id).await
}

/// PUT /api/candidate/:candidate_id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    body: Body,
) -> Result<Json<Value>, AppError> {
    update(state, Collection::Candidates, candidate_id, body).await
}

/// DELETE /api/candidate/:candidate_id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    delete(state, Collection::Candidates, candidate_id).await
}

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    list(state, Collection::Jobs).await
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    body: Body,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create(state, Collection::Jobs, body).await
}

/// GET /api/job/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    get(state, Collection::Jobs, job_id).await
}

/// PUT /api/job/:job_id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Body,
) -> Result<Json<Value>, AppError> {
    update(state, Collection::Jobs, job_id, body).await
}

/// DELETE /api/job/:job_id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    delete(state, Collection::Jobs, job_id).await
}
