//! Follows a task log by offset

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::TaskLog;
use tracing::{debug, info};

use crate::errors::WizardError;
use crate::http::client::HttpClient;

/// Log tail options
#[derive(Debug, Clone)]
pub struct Options {
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_log(&self, offset: u64) -> Result<TaskLog, WizardError>;
}

/// Which task log to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Install,
    ComponentChange,
}

pub struct TaskLogSource {
    client: Arc<HttpClient>,
    name: String,
    kind: LogKind,
}

impl TaskLogSource {
    pub fn new(client: Arc<HttpClient>, name: &str, kind: LogKind) -> Self {
        Self {
            client,
            name: name.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl LogSource for TaskLogSource {
    async fn fetch_log(&self, offset: u64) -> Result<TaskLog, WizardError> {
        match self.kind {
            LogKind::Install => self.client.get_install_log(&self.name, offset).await,
            LogKind::ComponentChange => {
                self.client.get_component_change_log(&self.name, offset).await
            }
        }
    }
}

/// Follow the log until shutdown fires; returns the last offset read
///
/// Errors are skipped: the status poller is what reports a dead service.
pub async fn run<L, K, S, F>(
    options: &Options,
    source: &L,
    mut sink: K,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> u64
where
    L: LogSource,
    K: FnMut(&str),
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Log tail starting...");
    let mut offset = 0;

    loop {
        let fetched = tokio::select! {
            _ = &mut shutdown_signal => break,
            fetched = source.fetch_log(offset) => fetched,
        };

        match fetched {
            Ok(chunk) => {
                if !chunk.log.is_empty() {
                    sink(&chunk.log);
                }
                // The service reports the offset to resume from
                if chunk.offset > offset {
                    offset = chunk.offset;
                }
            }
            Err(e) => debug!("Failed to read task log at {}: {}", offset, e),
        }

        tokio::select! {
            _ = &mut shutdown_signal => break,
            _ = sleep_fn(options.interval) => {}
        }
    }

    info!("Log tail stopped at offset {}", offset);
    offset
}
