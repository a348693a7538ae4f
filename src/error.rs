use reqwest::StatusCode;

/// Backend failure reported by a [`Storage`](crate::storage::Storage) implementation.
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response was received (connection, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request was rejected with 401 even after a token refresh.
    #[error("Not authenticated")]
    Unauthorized,

    /// The access token could not be renewed. The local session has been cleared.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Client error (4xx) with the body the server sent, for display to the user.
    #[error("API error ({status}): {body}")]
    Api {
        status: StatusCode,
        body: serde_json::Value,
    },

    /// Server error (5xx).
    #[error("Server error ({status})")]
    Server { status: StatusCode },

    /// A status outside 2xx, 4xx and 5xx (an unfollowed redirect, for example).
    #[error("Unexpected response status ({status})")]
    UnexpectedStatus { status: StatusCode },

    /// Login was rejected; carries the message to show on the login screen.
    #[error("{0}")]
    Login(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn storage(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }

    /// HTTP status attached to this error, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. }
            | Self::Server { status }
            | Self::UnexpectedStatus { status } => Some(*status),
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}
