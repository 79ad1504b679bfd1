use anyhow::{Context, Result};

/// Default model priority list, tried in order at startup.
const DEFAULT_LLM_MODELS: &str = "claude-sonnet-4-5,claude-3-5-haiku-latest";

/// Application configuration loaded from environment variables.
/// Only malformed values fail startup; every integration is optional.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL. When absent, records live in an in-process store.
    pub database_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub llm_models: Vec<String>,
    pub llm_timeout_secs: u64,
    pub archive: Option<ArchiveConfig>,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Object storage settings for keeping original uploads.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let archive_uploads = parse_bool(
            &std::env::var("ARCHIVE_UPLOADS").unwrap_or_else(|_| "false".to_string()),
        )
        .context("ARCHIVE_UPLOADS must be true or false")?;

        let archive = if archive_uploads {
            Some(ArchiveConfig {
                s3_bucket: require_env("S3_BUCKET")?,
                s3_endpoint: require_env("S3_ENDPOINT")?,
                aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            })
        } else {
            None
        };

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_models: parse_model_list(
                &std::env::var("LLM_MODELS").unwrap_or_else(|_| DEFAULT_LLM_MODELS.to_string()),
            ),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            archive,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognised boolean '{other}'"),
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool(" YES ").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_parse_model_list_keeps_priority_order() {
        let models = parse_model_list(" claude-a , ,claude-b,");
        assert_eq!(models, vec!["claude-a".to_string(), "claude-b".to_string()]);
    }
}
