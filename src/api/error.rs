use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Unauthorized - session is no longer valid")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the API for 4xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid dumping excessive data into messages
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Extract the server-provided `detail` message from an error body, if any
    pub fn detail_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .filter(|d| !d.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            400..=499 => {
                let message = Self::detail_from_body(body)
                    .unwrap_or_else(|| format!("Request rejected ({})", status));
                ApiError::Validation(message)
            }
            500..=599 => ApiError::Server(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// True for a server-side 401, the signal that the session must be invalidated
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
