#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to reach the API: {0}")]
    FetchError(String),

    #[error("API responded with status {status}")]
    HttpStatus {
        status: u16,
        message: Option<String>,
    },

    #[error("Error parsing response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Text the server attached to a failed call, if it sent any.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            AppError::HttpStatus {
                message: Some(msg), ..
            } if !msg.trim().is_empty() => Some(msg.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::ParseError(err.to_string());
        }
        AppError::FetchError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
