pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod store;

use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::models::candidate::Candidate;
use crate::models::job::Job;
use crate::records::store::{Collection, DocumentStore};

async fn fetch_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    key: &str,
) -> Result<T, AppError> {
    let row = store
        .get(collection, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {key} not found", collection.label())))?;
    serde_json::from_value(row.data).map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "stored {} {key} is malformed: {e}",
            collection.label().to_lowercase()
        ))
    })
}

/// Loads a stored candidate, or `NotFound`.
pub async fn fetch_candidate(store: &dyn DocumentStore, candidate_id: &str) -> Result<Candidate, AppError> {
    fetch_typed(store, Collection::Candidates, candidate_id).await
}

/// Loads a stored job, or `NotFound`.
pub async fn fetch_job(store: &dyn DocumentStore, job_id: &str) -> Result<Job, AppError> {
    fetch_typed(store, Collection::Jobs, job_id).await
}
