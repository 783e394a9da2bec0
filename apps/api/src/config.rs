use anyhow::{Context, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_HRFLOW_BASE_URL: &str = "https://api.hrflow.ai/v1";

/// Application configuration loaded from environment variables.
/// Fails at startup if `OPENAI_API_KEY` is missing. HRFlow credentials are
/// optional here and checked per request by the scoring route.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub hrflow: HrflowConfig,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Default)]
pub struct HrflowConfig {
    pub api_key: Option<String>,
    pub user_email: Option<String>,
    pub source_key: Option<String>,
    pub base_url: String,
}

impl HrflowConfig {
    /// Returns `(api_key, user_email, source_key)` when all three are set.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.api_key, &self.user_email, &self.source_key) {
            (Some(key), Some(email), Some(source)) => {
                Some((key.as_str(), email.as_str(), source.as_str()))
            }
            _ => None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            hrflow: HrflowConfig {
                api_key: optional_env("HRFLOW_API_KEY"),
                user_email: optional_env("HRFLOW_USER_EMAIL"),
                source_key: optional_env("HRFLOW_SOURCE_KEY"),
                base_url: env_or("HRFLOW_BASE_URL", DEFAULT_HRFLOW_BASE_URL),
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_all_three_fields() {
        let mut hrflow = HrflowConfig {
            api_key: Some("key".to_string()),
            user_email: Some("ops@example.com".to_string()),
            source_key: None,
            base_url: DEFAULT_HRFLOW_BASE_URL.to_string(),
        };
        assert!(hrflow.credentials().is_none());

        hrflow.source_key = Some("src".to_string());
        assert_eq!(
            hrflow.credentials(),
            Some(("key", "ops@example.com", "src"))
        );
    }
}
