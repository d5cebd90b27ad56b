use thiserror::Error;

/// Session and transport error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
        /// `error` field of the response envelope, when the body carried one
        server_error: Option<String>,
    },

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token storage is locked by another process")]
    StoreLocked,

    #[error("Missing refresh token - cannot renew access token")]
    MissingRefreshToken,

    #[error("No authenticated user in the current session")]
    NotAuthenticated,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// HTTP status of the failed response, if the failure came from one
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }

    /// True when the server answered 401
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
    }

    /// Message supplied by the server in the envelope `error` field
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http {
                server_error: Some(message),
                ..
            } => Some(message.as_str()),
            Self::Rejected(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
