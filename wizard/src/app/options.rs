//! Application configuration options

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::WizardError;
use crate::flow::controller::ControllerOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::{keep_alive, log_tail, poller};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Installer service connection
    pub backend: BackendOptions,

    /// Deployment plan to drive
    pub plan_file: Option<PathBuf>,

    /// Ask the installer service to exit once the task has finished
    pub exit_service: bool,

    /// Poller worker options
    pub poller: poller::Options,

    /// Install log follower options
    pub log_tail: log_tail::Options,

    /// Keep-alive worker options
    pub keep_alive: keep_alive::Options,

    /// Error codes counted as transport failures
    pub transport_failure_codes: Vec<String>,

    pub service_stopped_threshold: usize,

    /// Freshness window of the resume record
    pub resume_window: Duration,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(StorageLayout::default(), &Settings::default())
    }
}

impl AppOptions {
    /// Options as configured by a settings file
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        Self {
            layout,
            backend: BackendOptions {
                base_url: settings.backend.base_url.clone(),
                request_timeout: Duration::from_secs(settings.backend.request_timeout_secs),
            },
            plan_file: None,
            exit_service: false,
            poller: poller::Options {
                interval: Duration::from_millis(settings.poller.interval_ms),
                initial_delay: Duration::from_millis(settings.poller.initial_delay_ms),
            },
            log_tail: log_tail::Options {
                interval: Duration::from_millis(settings.poller.interval_ms),
            },
            keep_alive: keep_alive::Options {
                interval: Duration::from_secs(settings.keep_alive_interval_secs),
            },
            transport_failure_codes: settings.transport_failure_codes.clone(),
            service_stopped_threshold: settings.service_stopped_threshold,
            resume_window: Duration::from_secs(settings.resume_window_mins * 60),
            max_shutdown_delay: Duration::from_secs(10),
        }
    }

    /// Apply `--key=value` command line flags
    pub fn with_cli_args(
        mut self,
        cli_args: &HashMap<String, String>,
    ) -> Result<Self, WizardError> {
        if let Some(backend) = cli_args.get("backend") {
            self.backend.base_url = backend.clone();
        }
        if let Some(plan) = cli_args.get("plan") {
            self.plan_file = Some(PathBuf::from(plan));
        }
        if let Some(exit) = cli_args.get("exit") {
            self.exit_service = exit.parse().map_err(|_| {
                WizardError::ConfigError(format!("--exit expects true or false, got {}", exit))
            })?;
        }
        Ok(self)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            poller: self.poller.clone(),
            service_stopped_threshold: self.service_stopped_threshold,
        }
    }
}

/// Installer service connection options
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub base_url: String,
    pub request_timeout: Duration,
}
