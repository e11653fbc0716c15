use std::env;

use crate::error::AppError;

/// Default backend used when no base URL is injected.
pub const DEFAULT_API_URL: &str = "http://localhost:4000";

/// Environment variables consulted for the backend base URL, in priority order.
const API_URL_VARS: [&str; 3] = ["CAUSE_TREE_API_URL", "AF_API_URL", "NG_APP_API_URL"];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API settings.
    pub api: ApiConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// HTTP request settings.
    pub request: RequestConfig,
    /// AI assist settings.
    pub assist: AssistConfig,
    /// Page controller settings.
    pub page: PageConfig,
}

/// Backend API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries for idempotent requests.
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    pub retry_delay_ms: u64,
}

/// AI assist configuration
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Answer node suggestions locally when the inference service fails.
    pub heuristic_fallback: bool,
}

/// Page controller configuration
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Number of recent trees fetched for the history list.
    pub history_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = API_URL_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config {
                message: format!("API base URL must be http(s): {}", base_url),
            });
        }

        let api = ApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
        };

        let assist = AssistConfig {
            heuristic_fallback: match env::var("AI_HEURISTIC_FALLBACK")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .as_str()
            {
                "false" | "0" | "no" | "off" => false,
                _ => true,
            },
        };

        let page = PageConfig {
            history_limit: env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(12),
        };

        Ok(Config {
            api,
            logging,
            request,
            assist,
            page,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            heuristic_fallback: true,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { history_limit: 12 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay_ms, 500);
    }

    #[test]
    fn test_api_config_default_is_localhost() {
        assert_eq!(ApiConfig::default().base_url, "http://localhost:4000");
    }

    #[test]
    fn test_assist_and_page_defaults() {
        assert!(AssistConfig::default().heuristic_fallback);
        assert_eq!(PageConfig::default().history_limit, 12);
    }
}
