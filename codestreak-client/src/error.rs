use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Every failure the engine can observe from its collaborators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Network unreachable, connection reset, timeout.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx response, with the server's text if it sent one.
    #[error("server responded with status {status}")]
    Server { status: u16, message: Option<String> },
    /// Client-side precondition that failed before any network call.
    #[error("{0}")]
    Validation(String),
    /// A local rollback/removal target was not in the snapshot.
    #[error("{0} not found locally")]
    NotFoundLocally(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: Some(message.into()) }
    }

    /// Text suitable for `UiState.error`.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message: Some(message), .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Server { status: status.as_u16(), message: None }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
