use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed view over a stored job document. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    #[serde(default, alias = "jd_text")]
    pub jd_text_128: Option<String>,
    #[serde(default)]
    pub job_family: Option<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
