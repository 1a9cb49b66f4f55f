//! Component change endpoints: adding components to, or removing them
//! from, an existing deployment

use openapi_client::models::{PrecheckStatus, TaskLog, TaskStatus};
use serde::Serialize;
use serde_json::Value;

use crate::errors::WizardError;
use crate::http::client::HttpClient;
use crate::http::deployments::LogQuery;
use crate::models::deployment::DeploymentConfig;

/// Query of a component removal
#[derive(Debug, Clone, Serialize)]
pub struct RemoveComponentsQuery {
    /// Comma separated component names
    pub components: String,
}

impl HttpClient {
    /// Register the components to add to `name`
    pub async fn create_component_change(
        &self,
        name: &str,
        config: &DeploymentConfig,
    ) -> Result<(), WizardError> {
        let path = format!("/api/v1/component_change/{}", name);
        let _: Value = self.post(&path, config).await?;
        Ok(())
    }

    pub async fn start_component_change_precheck(&self, name: &str) -> Result<(), WizardError> {
        let path = format!("/api/v1/component_change/{}/precheck", name);
        let _: Value = self.post_empty(&path).await?;
        Ok(())
    }

    pub async fn get_component_change_precheck(
        &self,
        name: &str,
    ) -> Result<PrecheckStatus, WizardError> {
        let path = format!("/api/v1/component_change/{}/precheck", name);
        self.get(&path).await
    }

    /// Start adding the registered components
    pub async fn start_component_change(&self, name: &str) -> Result<(), WizardError> {
        let path = format!("/api/v1/component_change/{}/component_change", name);
        let _: Value = self.post_empty(&path).await?;
        Ok(())
    }

    pub async fn get_component_change_status(
        &self,
        name: &str,
    ) -> Result<TaskStatus, WizardError> {
        let path = format!("/api/v1/component_change/{}/component_change", name);
        self.get(&path).await
    }

    pub async fn get_component_change_log(
        &self,
        name: &str,
        offset: u64,
    ) -> Result<TaskLog, WizardError> {
        let path = format!("/api/v1/component_change/{}/component_change/log", name);
        self.get_with_query(&path, &LogQuery { offset }).await
    }

    /// Start removing `components` from `name`
    pub async fn remove_components(
        &self,
        name: &str,
        components: &[String],
    ) -> Result<(), WizardError> {
        let path = format!("/api/v1/component_change/{}", name);
        let query = RemoveComponentsQuery {
            components: components.join(","),
        };
        let _: Value = self.delete_with_query(&path, &query).await?;
        Ok(())
    }

    pub async fn get_remove_status(&self, name: &str) -> Result<TaskStatus, WizardError> {
        let path = format!("/api/v1/component_change/{}/del", name);
        self.get(&path).await
    }
}
