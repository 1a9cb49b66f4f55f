//! Installer service process endpoints

use openapi_client::models::{KeepAliveRequest, PublicKeyResponse, ServiceInfo};
use serde_json::Value;

use crate::errors::WizardError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Get service info
    pub async fn get_info(&self) -> Result<ServiceInfo, WizardError> {
        self.get("/api/v1/info").await
    }

    /// Keep the wizard session alive
    pub async fn keep_alive(&self, token: &str, overwrite: bool) -> Result<(), WizardError> {
        let body = KeepAliveRequest {
            token: token.to_string(),
            overwrite,
        };
        let _: Value = self.post("/api/v1/connect/keep_alive", &body).await?;
        Ok(())
    }

    /// Ask the installer process to exit
    pub async fn suicide(&self) -> Result<(), WizardError> {
        let _: Value = self.post_empty("/api/v1/processes/suicide").await?;
        Ok(())
    }

    /// Get the RSA public key used for secret fields
    pub async fn get_public_key(&self) -> Result<String, WizardError> {
        let response: PublicKeyResponse = self.get("/api/v1/keys/rsa/public").await?;
        Ok(response.public_key)
    }
}
