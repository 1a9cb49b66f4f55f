//! Error types for the deployment wizard

use thiserror::Error;

use crate::http::pipeline::PipelineEntry;

/// Why a request to the installer service failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// No usable envelope came back; `code` is the transport error code
    Transport { code: String, message: String },

    /// The envelope came back with `success: false`
    Application { code: i64, msg: String },
}

impl RequestFailure {
    pub fn is_transport(&self) -> bool {
        matches!(self, RequestFailure::Transport { .. })
    }

    /// Transport code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            RequestFailure::Transport { code, .. } => Some(code),
            RequestFailure::Application { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RequestFailure::Transport { message, .. } => message,
            RequestFailure::Application { msg, .. } => msg,
        }
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestFailure::Transport { code, message } => write!(f, "{}: {}", code, message),
            RequestFailure::Application { code, msg } => write!(f, "[{}] {}", code, msg),
        }
    }
}

/// Main error type for the wizard
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A request failed; `error_pipeline` is the transport-failure ledger
    /// as it stood right after this response was recorded
    #[error("Request failed: {failure}")]
    Request {
        failure: RequestFailure,
        error_pipeline: Vec<PipelineEntry>,
    },

    #[error("Encryption error: {0}")]
    EncryptError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid transition: {0}")]
    TransitionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WizardError {
    /// The request failure, if this error came from the request layer
    pub fn request_failure(&self) -> Option<&RequestFailure> {
        match self {
            WizardError::Request { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// The ledger handed back with a failed request
    pub fn error_pipeline(&self) -> &[PipelineEntry] {
        match self {
            WizardError::Request { error_pipeline, .. } => error_pipeline,
            _ => &[],
        }
    }
}

impl From<anyhow::Error> for WizardError {
    fn from(err: anyhow::Error) -> Self {
        WizardError::Internal(err.to_string())
    }
}
