pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::inference::handlers as inference;
use crate::records::handlers as records;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::home_handler))
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        // Records
        .route(
            "/api/candidates",
            get(records::handle_list_candidates).post(records::handle_create_candidate),
        )
        .route(
            "/api/candidate/:candidate_id",
            get(records::handle_get_candidate)
                .put(records::handle_update_candidate)
                .delete(records::handle_delete_candidate),
        )
        .route(
            "/api/jobs",
            get(records::handle_list_jobs).post(records::handle_create_job),
        )
        .route(
            "/api/job/:job_id",
            get(records::handle_get_job)
                .put(records::handle_update_job)
                .delete(records::handle_delete_job),
        )
        // Predictions
        .route("/api/salary/predict", post(inference::handle_predict_salary))
        .route(
            "/api/candidate_priority/predict",
            post(inference::handle_predict_priority),
        )
        .route(
            "/api/resume_advance/predict",
            post(inference::handle_predict_resume_advance),
        )
        .route("/api/job_fit/predict", post(inference::handle_predict_job_fit))
        // Assistant
        .route("/api/chat", post(assistant::handle_chat))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::testing::{text_reply, ScriptedModel};
    use crate::inference::advance::ResumeAdvanceScorer;
    use crate::inference::embedding::HashingEmbedder;
    use crate::inference::registry::ModelRegistry;
    use crate::inference::testing::{advance_bundle_json, salary_bundle_json, priority_bundle_json, write_bundle};
    use crate::records::memory::MemoryStore;
    use crate::records::store::Collection;

    fn app(dir: &Path, with_priority: bool) -> Router {
        write_bundle(dir, "salary.json", &salary_bundle_json());
        if with_priority {
            write_bundle(dir, "priority.json", &priority_bundle_json());
        }
        let scorer = ResumeAdvanceScorer::from_json(
            &advance_bundle_json(),
            Path::new("advance.json"),
            Arc::new(HashingEmbedder::new(8)),
        )
        .unwrap();
        let models = ModelRegistry::new(
            dir.join("salary.json"),
            dir.join("priority.json"),
            dir.join("advance.json"),
            false,
        )
        .with_advance_scorer(scorer);

        let store = MemoryStore::new()
            .with(
                Collection::Candidates,
                json!({
                    "candidate_id": "CAND001",
                    "name": "Ada",
                    "years_experience": 7,
                    "skills": ["Python", "AWS"],
                    "referral": "yes"
                }),
            )
            .with(
                Collection::Jobs,
                json!({ "job_id": "JOB1", "required_skills": ["Python", "Kafka", "AWS", "Go"] }),
            );

        build_router(AppState {
            store: Arc::new(store),
            chat: Arc::new(ScriptedModel::new(vec![text_reply("There is one candidate.")])),
            models: Arc::new(models),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "recruit-api");

        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_candidate_crud() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let new = json!({ "candidate_id": "CAND002", "name": "Grace", "skills": ["Go"] });
        let (status, body) = send(&app, "POST", "/api/candidates", Some(new.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Candidate created");
        assert_eq!(body["candidate_id"], "CAND002");
        assert!(body["id"].is_string());

        let (status, body) = send(&app, "POST", "/api/candidates", Some(new)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let patch = json!({ "name": "Grace H.", "candidate_id": "HIJACK" });
        let (status, _) = send(&app, "PUT", "/api/candidate/CAND002", Some(patch)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/api/candidate/CAND002", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Grace H.");
        assert_eq!(body["candidate_id"], "CAND002");
        assert_eq!(body["skills"], json!(["Go"]));

        let (_, list) = send(&app, "GET", "/api/candidates", None).await;
        assert_eq!(list.as_array().unwrap().len(), 2);

        let (status, _) = send(&app, "DELETE", "/api/candidate/CAND002", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", "/api/candidate/CAND002", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_record_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let (status, _) = send(&app, "POST", "/api/jobs", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/api/jobs", Some(json!({ "title": "SRE" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "job_id is required");

        let (status, _) = send(&app, "PUT", "/api/job/NOPE", Some(json!({ "title": "SRE" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/api/job/NOPE", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_salary_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let input = json!({ "years_experience": 2, "role": "data" });
        let (status, body) = send(&app, "POST", "/api/salary/predict", Some(input)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "salary": "$84,000.00" }));

        let (status, body) = send(&app, "POST", "/api/salary/predict", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No input data provided");
    }

    #[tokio::test]
    async fn test_priority_merges_stored_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let (status, body) = send(
            &app,
            "POST",
            "/api/candidate_priority/predict",
            Some(json!({ "candidate_id": "CAND001" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priority"], "High");
        assert_eq!(body["confidence"], "70.0%");

        // Request fields win over stored ones.
        let input = json!({ "candidate_id": "CAND001", "referral": "no", "years_experience": 1 });
        let (_, body) = send(&app, "POST", "/api/candidate_priority/predict", Some(input)).await;
        assert_eq!(body["priority"], "Low");
    }

    #[tokio::test]
    async fn test_missing_priority_model_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), false);

        let input = json!({ "years_experience": 4 });
        let (status, body) = send(&app, "POST", "/api/candidate_priority/predict", Some(input)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "MODEL_LOAD_ERROR");
    }

    #[tokio::test]
    async fn test_resume_advance_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let input = json!({
            "resume_text": "Python and AWS engineer with 5 years experience",
            "jd_text": "Looking for Python, AWS and Docker",
            "job_family": "Backend",
            "seniority": "Mid"
        });
        let (status, body) = send(&app, "POST", "/api/resume_advance/predict", Some(input)).await;
        assert_eq!(status, StatusCode::OK);
        let p = body["advance_probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(body["likely_to_advance"], p >= 0.5);

        let (status, body) = send(
            &app,
            "POST",
            "/api/resume_advance/predict",
            Some(json!({ "jd_text": "Python" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("resume_text"));
    }

    #[tokio::test]
    async fn test_job_fit_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let input = json!({ "candidate_id": "CAND001", "job_id": "JOB1" });
        let (status, body) = send(&app, "POST", "/api/job_fit/predict", Some(input)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fit_score"], 50);
        assert_eq!(body["missing_skills"], json!(["Kafka", "Go"]));

        let (status, _) = send(&app, "POST", "/api/job_fit/predict", Some(json!({ "job_id": "JOB1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let input = json!({ "candidate_id": "CAND001", "job_id": "JOB404" });
        let (status, _) = send(&app, "POST", "/api/job_fit/predict", Some(input)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), true);

        let (status, body) = send(&app, "POST", "/api/chat", Some(json!({ "prompt": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No prompt provided");

        let (status, body) = send(&app, "POST", "/api/chat", Some(json!({ "prompt": "How many?" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "There is one candidate.");
        assert_eq!(body["tools_used"], json!([]));
    }
}
