//! Session keep-alive worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::WizardError;
use crate::http::client::HttpClient;

/// Keep-alive worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval between keep-alive posts
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Anything that can keep the installer session alive
#[async_trait]
pub trait KeepAliveExt: Send + Sync {
    async fn keep_alive(&self, token: &str, overwrite: bool) -> Result<(), WizardError>;
}

#[async_trait]
impl KeepAliveExt for HttpClient {
    async fn keep_alive(&self, token: &str, overwrite: bool) -> Result<(), WizardError> {
        HttpClient::keep_alive(self, token, overwrite).await
    }
}

/// New per-process session token
pub fn session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Run the keep-alive worker
///
/// The first post claims the session (`overwrite`), later ones only
/// refresh it.
pub async fn run<T, S, F>(
    options: &Options,
    client: &T,
    token: &str,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    T: KeepAliveExt,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Keep-alive worker starting...");
    let mut overwrite = true;

    loop {
        let posted = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Keep-alive worker shutting down...");
                return;
            }
            posted = client.keep_alive(token, overwrite) => posted,
        };

        match posted {
            Ok(()) => {
                debug!("Session kept alive");
                overwrite = false;
            }
            Err(e) => {
                error!("Keep-alive failed: {}", e);
                // Will retry on next interval
            }
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Keep-alive worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}
