use std::env;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_FALLBACK_ERROR: &str = "Something went wrong while answering. Please try again.";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub typing_delay: Duration,
    pub fallback_error: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            // Ranking is refreshed every 20 minutes
            poll_interval: Duration::from_secs(20 * 60),
            typing_delay: Duration::from_millis(30),
            fallback_error: DEFAULT_FALLBACK_ERROR.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let api_base_url = match lookup("SPHERE_API_URL") {
            Some(url) if !url.trim().is_empty() => normalize_base_url(&url)?,
            _ => defaults.api_base_url,
        };

        let request_timeout = match lookup("SPHERE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number(&raw, "request timeout")?),
            None => defaults.request_timeout,
        };
        let poll_interval = match lookup("SPHERE_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs = parse_number(&raw, "poll interval")?;
                if secs == 0 {
                    return Err(AppError::ConfigError("Poll interval must be positive".to_string()));
                }
                Duration::from_secs(secs)
            }
            None => defaults.poll_interval,
        };
        let typing_delay = match lookup("SPHERE_TYPING_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number(&raw, "typing delay")?),
            None => defaults.typing_delay,
        };

        let fallback_error = lookup("SPHERE_FALLBACK_ERROR")
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or(defaults.fallback_error);

        Ok(Config {
            api_base_url,
            request_timeout,
            poll_interval,
            typing_delay,
            fallback_error,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::ConfigError(format!("Invalid API URL: {}", raw)));
    }
    Ok(url.to_string())
}

fn parse_number(raw: &str, what: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", what, e)))
}
