use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::inference::embedding::EmbedderKind;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub salary_model_path: PathBuf,
    pub priority_model_path: PathBuf,
    pub advance_model_path: PathBuf,
    /// Keep loaded tabular bundles in memory instead of re-reading them per request.
    pub cache_bundles: bool,
    /// Text embedder the resume-advance network was trained against.
    pub embedder: EmbedderKind,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            salary_model_path: path_env("SALARY_MODEL_PATH", "models/salary_bundle.json"),
            priority_model_path: path_env("PRIORITY_MODEL_PATH", "models/priority_bundle.json"),
            advance_model_path: path_env("ADVANCE_MODEL_PATH", "models/advance_bundle.json"),
            cache_bundles: parse_flag(std::env::var("MODEL_CACHE").ok().as_deref())
                .context("MODEL_CACHE must be true or false")?,
            embedder: std::env::var("EMBEDDER")
                .unwrap_or_default()
                .parse()
                .context("EMBEDDER must be 'hashing' or 'minilm'")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn path_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("unrecognized flag value '{other}'"),
    }
}
