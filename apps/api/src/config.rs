use anyhow::{Context, Result};

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook-test/resume-rank";

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on the number of files held by the session.
    pub max_files: usize,
    /// Request body limit for multipart uploads, in bytes.
    pub max_upload_bytes: usize,
    /// Artificial processing time before ranking runs.
    pub analysis_delay_ms: u64,
    pub delivery_timeout_secs: u64,
    /// Initial webhook endpoint. Empty disables delivery.
    pub webhook_url: Option<String>,
    /// Seed for the demo score/keyword providers. Unset means OS entropy.
    pub ranker_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            max_files: 10,
            max_upload_bytes: 25 * 1024 * 1024,
            analysis_delay_ms: 2000,
            delivery_timeout_secs: 10,
            webhook_url: Some(DEFAULT_WEBHOOK_URL.to_string()),
            ranker_seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        let max_upload_mb: usize = parse_env("MAX_UPLOAD_MB", 25)?;

        Ok(Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            max_files: parse_env("MAX_FILES", defaults.max_files)?,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            analysis_delay_ms: parse_env("ANALYSIS_DELAY_MS", defaults.analysis_delay_ms)?,
            delivery_timeout_secs: parse_env(
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout_secs,
            )?,
            webhook_url: match std::env::var("WEBHOOK_URL") {
                Ok(url) => normalize_webhook(&url),
                Err(_) => defaults.webhook_url,
            },
            ranker_seed: match std::env::var("RANKER_SEED") {
                Ok(raw) => Some(
                    raw.parse::<u64>()
                        .context("RANKER_SEED must be an unsigned integer")?,
                ),
                Err(_) => None,
            },
        })
    }
}

/// Blank endpoints mean "no delivery".
pub fn normalize_webhook(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
