//! HTTP client implementation

use std::sync::Arc;
use std::time::Duration;

use openapi_client::models::Envelope;
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::errors::{RequestFailure, WizardError};
use crate::http::pipeline::{
    PipelineEntry, RequestPipeline, ERR_BAD_REQUEST, ERR_BAD_RESPONSE, ERR_NETWORK,
};

/// HTTP client for the installer service
///
/// Every response, successful or not, is recorded in the shared
/// [`RequestPipeline`].
pub struct HttpClient {
    client: Client,
    base_url: String,
    pipeline: Arc<RequestPipeline>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        pipeline: Arc<RequestPipeline>,
    ) -> Result<Self, WizardError> {
        Url::parse(base_url).map_err(|e| {
            WizardError::ConfigError(format!("invalid backend url {}: {}", base_url, e))
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pipeline,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The ledger this client records into
    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        self.execute(path, self.client.get(&url)).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        self.execute(path, self.client.get(&url).query(query)).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        self.execute(path, self.client.post(&url).json(body)).await
    }

    /// Make a POST request without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        self.execute(path, self.client.post(&url)).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("PUT {}", url);
        self.execute(path, self.client.put(&url).json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);
        self.execute(path, self.client.delete(&url)).await
    }

    /// Make a DELETE request with query parameters
    pub async fn delete_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, WizardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);
        self.execute(path, self.client.delete(&url).query(query)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, WizardError> {
        let (status, outcome) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await;
                (Some(status.as_u16()), decode_envelope(status, body))
            }
            Err(e) => (
                None,
                Err(RequestFailure::Transport {
                    code: ERR_NETWORK.to_string(),
                    message: e.to_string(),
                }),
            ),
        };

        match outcome {
            Ok(data) => {
                self.pipeline
                    .push(PipelineEntry::success(path, status.unwrap_or_default()));
                Ok(data)
            }
            Err(failure) => {
                self.pipeline
                    .push(PipelineEntry::failure(path, status, &failure));
                error!("Request to {} failed: {}", path, failure);
                Err(WizardError::Request {
                    failure,
                    error_pipeline: self.pipeline.snapshot(),
                })
            }
        }
    }
}

/// Classify a response and unwrap its envelope
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: Result<String, reqwest::Error>,
) -> Result<T, RequestFailure> {
    let body = body.map_err(|e| RequestFailure::Transport {
        code: ERR_NETWORK.to_string(),
        message: e.to_string(),
    })?;

    let envelope: Envelope<Value> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            let code = if status.is_client_error() {
                ERR_BAD_REQUEST
            } else {
                ERR_BAD_RESPONSE
            };
            return Err(RequestFailure::Transport {
                code: code.to_string(),
                message: format!("{} without a valid envelope: {}", status, e),
            });
        }
    };

    if !envelope.success {
        return Err(RequestFailure::Application {
            code: envelope.code,
            msg: application_message(&envelope),
        });
    }

    // A payload the models cannot read is not a transport failure
    serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| {
        RequestFailure::Application {
            code: envelope.code,
            msg: format!("unexpected payload: {}", e),
        }
    })
}

/// `msg`, or a message nested in `data`
fn application_message(envelope: &Envelope<Value>) -> String {
    if !envelope.msg.is_empty() {
        return envelope.msg.clone();
    }

    envelope
        .data
        .as_ref()
        .and_then(|data| {
            ["msg", "message", "detail"]
                .iter()
                .find_map(|key| data.get(key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with code {}", envelope.code))
}
