//! Failure taxonomy for one interaction cycle.

use serde_json::Value;
use thiserror::Error;

/// Tag identifying which kind of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Http,
    Format,
    Network,
    Unclassified,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Http => "http",
            FailureKind::Format => "format",
            FailureKind::Network => "network",
            FailureKind::Unclassified => "unclassified",
        }
    }

    pub const fn all() -> &'static [FailureKind] {
        &[
            FailureKind::Timeout,
            FailureKind::Http,
            FailureKind::Format,
            FailureKind::Network,
            FailureKind::Unclassified,
        ]
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort error body returned alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Json(Value),
    Text(String),
    Empty,
}

impl ErrorDetail {
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return ErrorDetail::Empty;
        }

        match serde_json::from_str(body) {
            Ok(value) => ErrorDetail::Json(value),
            Err(_) => ErrorDetail::Text(truncate_body(body)),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request to {base_url} timed out")]
    Timeout { base_url: String },

    #[error("backend returned HTTP {status}")]
    Http { status: u16, detail: ErrorDetail },

    #[error("could not decode JSON response: {0}")]
    Format(String),

    #[error("could not connect to {base_url}: {message}")]
    Network { base_url: String, message: String },

    #[error("{0}")]
    Unclassified(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout { .. } => FailureKind::Timeout,
            FetchError::Http { .. } => FailureKind::Http,
            FetchError::Format(_) => FailureKind::Format,
            FetchError::Network { .. } => FailureKind::Network,
            FetchError::Unclassified(_) => FailureKind::Unclassified,
        }
    }

    /// Headline shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Timeout { base_url } => {
                format!("Error: Request timed out connecting to backend API ({base_url}).")
            }
            FetchError::Http { status, .. } => {
                format!("Error: Backend API returned an HTTP error: {status}")
            }
            FetchError::Format(_) => {
                "Error: Could not decode JSON response from backend.".to_string()
            }
            FetchError::Network { base_url, message } => format!(
                "Error connecting to backend API at {base_url}. \
                 Please check the URL and ensure the backend is running. Error: {message}"
            ),
            FetchError::Unclassified(message) => format!("Unexpected error: {message}"),
        }
    }

    /// Secondary guidance line shown under the headline.
    pub fn hint(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => {
                "The backend might be starting up if it was idle. Please try again in a minute."
            }
            FetchError::Http { .. } => {
                "This might happen if the backend couldn't fetch data from external sources \
                 (e.g., OpenWeatherMap) or if there was an internal issue."
            }
            FetchError::Format(_) => {
                "This might indicate an unexpected backend error. Check the backend logs for more details."
            }
            FetchError::Network { .. } => {
                "Check the configured base URL with `klymate configure` or pass --base-url."
            }
            FetchError::Unclassified(_) => {
                "This might be an issue in the dashboard itself or in how it handled the response."
            }
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            FetchError::Http { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
