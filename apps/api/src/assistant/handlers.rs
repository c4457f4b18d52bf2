use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::assistant::tools::Toolbox;
use crate::assistant::{run_chat, ChatReply};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let prompt = body
        .ok()
        .and_then(|Json(req)| req.prompt)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No prompt provided".to_string()))?;

    let toolbox = Toolbox::new(Arc::clone(&state.store), Arc::clone(&state.models));
    let reply = run_chat(state.chat.as_ref(), &toolbox, &prompt)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    Ok(Json(reply))
}
