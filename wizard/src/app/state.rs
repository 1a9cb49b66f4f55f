//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::WizardError;
use crate::flow::controller::WizardController;
use crate::flow::fsm::Flow;
use crate::flow::resume::{ResumeStore, SystemClock};
use crate::http::client::HttpClient;
use crate::http::pipeline::RequestPipeline;
use crate::workers::keep_alive::session_token;

/// Main application state
pub struct AppState {
    /// Transport-failure ledger shared by every request of the session
    pub pipeline: Arc<RequestPipeline>,

    /// HTTP client for the installer service
    pub http_client: Arc<HttpClient>,

    /// Token claiming the installer session
    pub session_token: String,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, WizardError> {
        info!("Initializing application state...");

        options.layout.setup().await?;

        let pipeline = Arc::new(RequestPipeline::new(
            options.transport_failure_codes.iter().cloned(),
        ));
        let http_client = Arc::new(HttpClient::new(
            &options.backend.base_url,
            options.backend.request_timeout,
            pipeline.clone(),
        )?);

        Ok(Self {
            pipeline,
            http_client,
            session_token: session_token(),
        })
    }

    /// A controller for `flow` bound to this session
    pub fn controller(&self, flow: Flow, options: &AppOptions) -> WizardController {
        let resume = ResumeStore::new(
            options.layout.resume_file(),
            options.resume_window,
            Arc::new(SystemClock),
        );
        WizardController::new(
            flow,
            self.http_client.clone(),
            resume,
            options.controller_options(),
        )
    }
}
