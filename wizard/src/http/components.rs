//! Component catalogue endpoints

use openapi_client::models::{
    ComponentInfo, DataList, ParameterFilter, ParameterMeta, ParameterRequest, ParameterType,
};

use crate::errors::WizardError;
use crate::http::client::HttpClient;
use crate::params::components::{canonical_key, OBCONFIGSERVER};

/// Default forced on the config server's log size parameter
const CONFIGSERVER_LOG_MAXSIZE: &str = "30MB";

impl HttpClient {
    /// List installable components
    pub async fn list_components(&self) -> Result<Vec<ComponentInfo>, WizardError> {
        let response: DataList<ComponentInfo> = self.get("/api/v1/components").await?;
        Ok(response.items)
    }

    /// Get one component and its versions
    pub async fn get_component(&self, name: &str) -> Result<ComponentInfo, WizardError> {
        let path = format!("/api/v1/components/{}", name);
        self.get(&path).await
    }

    /// Get parameter metadata for the given component versions
    pub async fn get_parameters(
        &self,
        filters: Vec<ParameterFilter>,
    ) -> Result<Vec<ParameterMeta>, WizardError> {
        let body = ParameterRequest { filters };
        let response: DataList<ParameterMeta> =
            self.post("/api/v1/components/parameters", &body).await?;
        Ok(post_process_parameters(response.items))
    }
}

/// Fix up parameter metadata as served by the installer
///
/// The config server's `log_maxsize` is always edited in MB, and nothing
/// counts as changed before the operator touches it.
pub fn post_process_parameters(mut metas: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    for meta in &mut metas {
        let is_configserver = canonical_key(&meta.component) == OBCONFIGSERVER;
        for parameter in &mut meta.config_parameters {
            if is_configserver && parameter.name == "log_maxsize" {
                parameter.default = CONFIGSERVER_LOG_MAXSIZE.to_string();
                parameter.param_type = ParameterType::CapacityMB;
                parameter.unit_disable = true;
            }
            parameter.is_changed = false;
        }
    }
    metas
}
