use std::io;

/// Message shown when the identity provider has no user or posting key.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please login with your posting key first.";

/// Terminal failure of one upload attempt.
///
/// The `Display` text is also what the progress sink receives in the
/// terminal error event, so both channels report the same message.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{}", LOGIN_REQUIRED_MESSAGE)]
    AuthRequired,
    #[error("Failed to read image: {0}")]
    FileRead(#[source] io::Error),
    #[error("Failed to sign image: {0:#}")]
    SigningFailure(anyhow::Error),
    #[error("{0}")]
    ServerError(String),
    #[error("Invalid server response.")]
    MalformedResponse,
    #[error("Upload failed: {status_text}")]
    HttpFailure { status: u16, status_text: String },
    #[error("Network error during upload.")]
    NetworkFailure(#[source] TransportError),
    #[error("Upload cancelled.")]
    Cancelled,
}

impl UploadError {
    /// True for failures raised before any request left the client.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            UploadError::AuthRequired
                | UploadError::FileRead(_)
                | UploadError::SigningFailure(_)
        )
    }
}

/// The request produced no response at all.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_connect() {
            "connection failed"
        } else if error.is_timeout() {
            "request timed out"
        } else {
            "request failed"
        };
        Self::with_source(message, error)
    }
}

/// Invalid uploader configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid upload endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
