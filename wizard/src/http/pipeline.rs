//! Transport-failure ledger
//!
//! Every response is pushed here. Transport-class failures accumulate; any
//! other response (a success or an application-level failure) clears the
//! ledger. A run of consecutive transport failures is how callers infer that
//! the installer process has gone away.

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::RequestFailure;

/// No response reached the client
pub const ERR_NETWORK: &str = "ERR_NETWORK";

/// A server-side error status without a usable envelope
pub const ERR_BAD_RESPONSE: &str = "ERR_BAD_RESPONSE";

/// A client-side error status without a usable envelope
pub const ERR_BAD_REQUEST: &str = "ERR_BAD_REQUEST";

/// Codes treated as transport-class unless configured otherwise
pub fn default_transport_codes() -> Vec<String> {
    vec![ERR_NETWORK.to_string(), ERR_BAD_RESPONSE.to_string()]
}

/// One recorded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEntry {
    /// Transport error code, `None` for envelopes
    pub code: Option<String>,

    /// HTTP status, when a response arrived
    pub status: Option<u16>,

    /// Request path
    pub path: String,

    pub message: String,

    pub at: DateTime<Utc>,
}

impl PipelineEntry {
    pub fn success(path: &str, status: u16) -> Self {
        Self {
            code: None,
            status: Some(status),
            path: path.to_string(),
            message: String::new(),
            at: Utc::now(),
        }
    }

    pub fn failure(path: &str, status: Option<u16>, failure: &RequestFailure) -> Self {
        Self {
            code: failure.code().map(str::to_string),
            status,
            path: path.to_string(),
            message: failure.message().to_string(),
            at: Utc::now(),
        }
    }
}

/// Session-scoped ledger of consecutive transport failures
pub struct RequestPipeline {
    transport_codes: HashSet<String>,
    entries: RwLock<Vec<PipelineEntry>>,
}

impl RequestPipeline {
    /// Create a ledger treating `transport_codes` as transport-class
    pub fn new<I, S>(transport_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transport_codes: transport_codes.into_iter().map(Into::into).collect(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn is_transport_code(&self, code: Option<&str>) -> bool {
        code.is_some_and(|c| self.transport_codes.contains(c))
    }

    /// Record a response
    pub fn push(&self, entry: PipelineEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if self.is_transport_code(entry.code.as_deref()) {
            entries.push(entry);
            debug!("Transport failure recorded, {} in a row", entries.len());
        } else if !entries.is_empty() {
            debug!("Clearing {} transport failures", entries.len());
            entries.clear();
        }
    }

    /// Copy of the current ledger
    pub fn snapshot(&self) -> Vec<PipelineEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the ledger is non-empty and holds only transport-class entries
    pub fn all_transport(&self) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        !entries.is_empty()
            && entries
                .iter()
                .all(|entry| self.is_transport_code(entry.code.as_deref()))
    }

    /// Start a new session
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

impl Default for RequestPipeline {
    fn default() -> Self {
        Self::new(default_transport_codes())
    }
}

/// Whether a handed-back ledger holds at least `threshold` transport failures
pub fn is_service_stopped(error_pipeline: &[PipelineEntry], threshold: usize) -> bool {
    threshold > 0
        && error_pipeline.len() >= threshold
        && error_pipeline.iter().all(|entry| entry.code.is_some())
}
