//! Settings file management

use serde::{Deserialize, Serialize};

use crate::http::pipeline::default_transport_codes;
use crate::logs::LogLevel;

/// Wizard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Installer service connection
    #[serde(default)]
    pub backend: BackendSettings,

    /// Task status polling
    #[serde(default)]
    pub poller: PollerSettings,

    #[serde(default = "default_keep_alive_interval")]
    pub keep_alive_interval_secs: u64,

    /// Error codes counted as transport failures
    #[serde(default = "default_transport_codes")]
    pub transport_failure_codes: Vec<String>,

    /// Consecutive transport failures after which the service is taken as stopped
    #[serde(default = "default_service_stopped_threshold")]
    pub service_stopped_threshold: usize,

    /// How long a resume record stays valid
    #[serde(default = "default_resume_window")]
    pub resume_window_mins: u64,
}

fn default_keep_alive_interval() -> u64 {
    10
}

fn default_service_stopped_threshold() -> usize {
    3
}

fn default_resume_window() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            backend: BackendSettings::default(),
            poller: PollerSettings::default(),
            keep_alive_interval_secs: default_keep_alive_interval(),
            transport_failure_codes: default_transport_codes(),
            service_stopped_threshold: default_service_stopped_threshold(),
            resume_window_mins: default_resume_window(),
        }
    }
}

/// Installer service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the installer service
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8680".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Poller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_initial_delay() -> u64 {
    500
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            initial_delay_ms: default_initial_delay(),
        }
    }
}
