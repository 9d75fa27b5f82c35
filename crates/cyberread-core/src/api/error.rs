use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credential missing or rejected")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected: {message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the backend: `{message?, errors?}`.
/// `errors` entries are either plain strings or `{msg}`/`{message}` objects.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEntry {
    Text(String),
    Detail {
        #[serde(alias = "msg")]
        message: String,
    },
}

impl ErrorEntry {
    fn into_message(self) -> String {
        match self {
            ErrorEntry::Text(text) => text,
            ErrorEntry::Detail { message } => message,
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The backend's `message` if the body has one, otherwise the raw body.
    fn describe(body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| Self::truncate_body(&m))
            .unwrap_or_else(|| Self::truncate_body(body))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 409 | 422 => {
                let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
                let errors: Vec<String> = parsed
                    .errors
                    .into_iter()
                    .map(ErrorEntry::into_message)
                    .collect();
                let message = parsed
                    .message
                    .or_else(|| errors.first().cloned())
                    .unwrap_or_else(|| format!("Request rejected with status {}", status));
                ApiError::Validation { message, errors }
            }
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(Self::describe(body)),
            404 => ApiError::NotFound(Self::describe(body)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::describe(body)),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(body))),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
