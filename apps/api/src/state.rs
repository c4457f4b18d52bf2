use std::sync::Arc;

use crate::inference::registry::ModelRegistry;
use crate::llm_client::ChatModel;
use crate::records::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Candidate and job documents. Postgres in production.
    pub store: Arc<dyn DocumentStore>,
    /// Model behind `/api/chat`. Default: `LlmClient`.
    pub chat: Arc<dyn ChatModel>,
    pub models: Arc<ModelRegistry>,
}
