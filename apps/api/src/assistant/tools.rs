//! Tools the assistant can call. Every tool runs in-process against the
//! document store and the model registry.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::inference::fit::check_job_fit;
use crate::inference::handlers::{prediction_body, predict_off_thread};
use crate::inference::predictor::PredictionKind;
use crate::inference::registry::ModelRegistry;
use crate::llm_client::ToolDefinition;
use crate::records::store::{Collection, DocumentStore};
use crate::records::{fetch_candidate, fetch_job};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("missing or invalid argument '{0}'")]
    MissingArgument(&'static str),

    #[error("{0}")]
    Failed(#[from] AppError),
}

fn id_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: { "type": "string" } },
        "required": [field]
    })
}

fn pair_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "candidate_id": { "type": "string" },
            "job_id": { "type": "string" }
        },
        "required": ["candidate_id", "job_id"]
    })
}

fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// The tool catalogue offered to the model on every turn.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_candidate",
            description: "Get candidate information by their ID.",
            input_schema: id_schema("candidate_id"),
        },
        ToolDefinition {
            name: "get_job",
            description: "Get job information by its ID.",
            input_schema: id_schema("job_id"),
        },
        ToolDefinition {
            name: "list_candidates",
            description: "Show a list of all available candidates.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "list_jobs",
            description: "Show a list of all available jobs.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "predict_salary",
            description: "Predict the salary for a role and a number of years of experience.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "role": { "type": "string" },
                    "years_experience": { "type": "number" }
                },
                "required": ["role", "years_experience"]
            }),
        },
        ToolDefinition {
            name: "check_job_fit",
            description: "Score how well a candidate's skills cover a job's required skills.",
            input_schema: pair_schema(),
        },
        ToolDefinition {
            name: "screen_resume",
            description: "Estimate the probability that a candidate's resume advances for a job.",
            input_schema: pair_schema(),
        },
        ToolDefinition {
            name: "get_priority",
            description: "Predict the screening priority (Low, Medium, High) of a candidate by ID.",
            input_schema: id_schema("candidate_id"),
        },
    ]
}

pub struct Toolbox {
    store: Arc<dyn DocumentStore>,
    models: Arc<ModelRegistry>,
}

fn str_arg<'a>(input: &'a Value, name: &'static str) -> Result<&'a str, ToolError> {
    input
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ToolError::MissingArgument(name))
}

impl Toolbox {
    pub fn new(store: Arc<dyn DocumentStore>, models: Arc<ModelRegistry>) -> Self {
        Self { store, models }
    }

    /// Runs one tool call and returns its JSON result.
    pub async fn dispatch(&self, name: &str, input: &Value) -> Result<Value, ToolError> {
        debug!("Dispatching tool {name}");
        match name {
            "get_candidate" => self.get(Collection::Candidates, str_arg(input, "candidate_id")?).await,
            "get_job" => self.get(Collection::Jobs, str_arg(input, "job_id")?).await,
            "list_candidates" => self.list(Collection::Candidates).await,
            "list_jobs" => self.list(Collection::Jobs).await,
            "predict_salary" => {
                let role = str_arg(input, "role")?;
                let years = input
                    .get("years_experience")
                    .and_then(Value::as_f64)
                    .ok_or(ToolError::MissingArgument("years_experience"))?;
                self.predict(
                    PredictionKind::Salary,
                    json!({ "role": role, "years_experience": years }),
                )
                .await
            }
            "check_job_fit" => {
                let candidate = fetch_candidate(self.store.as_ref(), str_arg(input, "candidate_id")?).await?;
                let job = fetch_job(self.store.as_ref(), str_arg(input, "job_id")?).await?;
                let fit = check_job_fit(&candidate, &job);
                Ok(serde_json::to_value(fit).map_err(|e| AppError::Internal(e.into()))?)
            }
            "screen_resume" => self.screen_resume(input).await,
            "get_priority" => {
                let candidate_id = str_arg(input, "candidate_id")?;
                let row = self
                    .store
                    .get(Collection::Candidates, candidate_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
                let mut body = self.predict(PredictionKind::Priority, row.data).await?;
                body["candidate_id"] = json!(candidate_id);
                Ok(body)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Value, ToolError> {
        let row = self
            .store
            .get(collection, key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {key} not found", collection.label())))?;
        Ok(row.into_document())
    }

    async fn list(&self, collection: Collection) -> Result<Value, ToolError> {
        let rows = self.store.list(collection).await?;
        Ok(Value::Array(rows.into_iter().map(|r| r.into_document()).collect()))
    }

    async fn predict(&self, kind: PredictionKind, input: Value) -> Result<Value, ToolError> {
        let result = predict_off_thread(&self.models, kind, input).await?;
        Ok(prediction_body(result)?)
    }

    async fn screen_resume(&self, input: &Value) -> Result<Value, ToolError> {
        let candidate_id = str_arg(input, "candidate_id")?;
        let job_id = str_arg(input, "job_id")?;
        let candidate = fetch_candidate(self.store.as_ref(), candidate_id).await?;
        let job = fetch_job(self.store.as_ref(), job_id).await?;

        let jd_text = job
            .jd_text_128
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| job.required_skills.join(", "));
        let features = json!({
            "resume_text": candidate.resume_text(),
            "jd_text": jd_text,
            "job_family": job.job_family,
            "seniority": job.seniority,
        });

        let mut body = self.predict(PredictionKind::ResumeAdvance, features).await?;
        body["candidate_id"] = json!(candidate_id);
        body["job_id"] = json!(job_id);
        Ok(body)
    }
}
