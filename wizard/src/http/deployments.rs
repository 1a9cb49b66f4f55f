//! Deployment API client

use openapi_client::models::{
    ComponentReport, ConnectionInfo, DataList, DeploymentInfo, PrecheckStatus, RecoverChange,
    TaskLog, TaskStatus,
};
use serde::Serialize;
use serde_json::Value;

use crate::errors::WizardError;
use crate::http::client::HttpClient;
use crate::models::deployment::DeploymentConfig;

/// Query of the deployment list
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_status: Option<String>,
}

/// Query of a task log
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LogQuery {
    pub offset: u64,
}

impl HttpClient {
    /// List deployments, optionally filtered by task status
    pub async fn list_deployments(
        &self,
        task_status: Option<&str>,
    ) -> Result<Vec<DeploymentInfo>, WizardError> {
        let query = DeploymentListQuery {
            task_status: task_status.map(str::to_string),
        };
        let response: DataList<DeploymentInfo> =
            self.get_with_query("/api/v1/deployments", &query).await?;
        Ok(response.items)
    }

    /// Create (or replace) a deployment from its config
    pub async fn create_deployment(
        &self,
        name: &str,
        config: &DeploymentConfig,
    ) -> Result<(), WizardError> {
        let path = format!("/api/v1/deployments/{}", name);
        let _: Value = self.put(&path, config).await?;
        Ok(())
    }

    /// Get connection info of an installed deployment
    pub async fn get_connection_info(
        &self,
        name: &str,
    ) -> Result<Vec<ConnectionInfo>, WizardError> {
        let path = format!("/api/v1/deployments/{}/connection", name);
        let response: DataList<ConnectionInfo> = self.get(&path).await?;
        Ok(response.items)
    }

    /// Get the install report
    pub async fn get_report(&self, name: &str) -> Result<Vec<ComponentReport>, WizardError> {
        let path = format!("/api/v1/deployments/{}/report", name);
        let response: DataList<ComponentReport> = self.get(&path).await?;
        Ok(response.items)
    }

    /// Start the precheck
    pub async fn start_precheck(&self, name: &str) -> Result<(), WizardError> {
        let path = format!("/api/v1/deployments/{}/precheck", name);
        let _: Value = self.post_empty(&path).await?;
        Ok(())
    }

    pub async fn get_precheck_status(&self, name: &str) -> Result<PrecheckStatus, WizardError> {
        let path = format!("/api/v1/deployments/{}/precheck", name);
        self.get(&path).await
    }

    /// Auto-fix recoverable precheck failures
    pub async fn recover(&self, name: &str) -> Result<Vec<RecoverChange>, WizardError> {
        let path = format!("/api/v1/deployments/{}/recover", name);
        let response: DataList<RecoverChange> = self.post_empty(&path).await?;
        Ok(response.items)
    }

    /// Start the install task
    pub async fn start_install(&self, name: &str) -> Result<(), WizardError> {
        let path = format!("/api/v1/deployments/{}/install", name);
        let _: Value = self.post_empty(&path).await?;
        Ok(())
    }

    pub async fn get_install_status(&self, name: &str) -> Result<TaskStatus, WizardError> {
        let path = format!("/api/v1/deployments/{}/install", name);
        self.get(&path).await
    }

    /// Get the install log from `offset`
    pub async fn get_install_log(&self, name: &str, offset: u64) -> Result<TaskLog, WizardError> {
        let path = format!("/api/v1/deployments/{}/install/log", name);
        self.get_with_query(&path, &LogQuery { offset }).await
    }

    /// Destroy a deployment
    pub async fn destroy_deployment(&self, name: &str) -> Result<(), WizardError> {
        let path = format!("/api/v1/deployments/{}", name);
        let _: Value = self.delete(&path).await?;
        Ok(())
    }

    pub async fn get_destroy_status(&self, name: &str) -> Result<TaskStatus, WizardError> {
        let path = format!("/api/v1/deployments/{}/destroy", name);
        self.get(&path).await
    }
}
