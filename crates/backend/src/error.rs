//! Error types for the backend facade.

use serde::Deserialize;
use thiserror::Error;

/// Failure of a single remote primitive.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("remote service returned {status}: {message}")]
    Remote {
        status: u16,
        kind: Option<String>,
        message: String,
    },
    #[error("http transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub fn remote(status: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            kind: Some(kind.into()),
            message: message.into(),
        }
    }

    /// HTTP status of a remote rejection, `None` for local or transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::Transport(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Error body returned by the remote service.
#[derive(Debug, Deserialize)]
pub(crate) struct RemoteErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}
