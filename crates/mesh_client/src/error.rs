use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    /// DNS, connect, timeout, body read, or request build failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Server answered 4xx/5xx. `body` is the raw response text.
    #[error("http status {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("missing api key (set {} or pass one explicitly)", crate::config::ENV_API_KEY)]
    MissingApiKey,
    #[error("config error: {0}")]
    Config(String),
}

impl MeshError {
    /// HTTP status for `Http` errors, or the status a transport error carries.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MeshError::Http { status, .. } => Some(*status),
            MeshError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, MeshError::Transport(_))
    }
}
