//! Deployment models

use std::collections::BTreeMap;

use openapi_client::models::ParameterFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::WizardError;
use crate::flow::fsm::Flow;
use crate::params::components::{canonical_key, OCPEXPRESS};
use crate::params::normalize::NewParameterMeta;

/// Deployment configuration as submitted to the installer service
///
/// Component sections live either under `components` or at the top level
/// next to the `auth` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentConfig(pub Value);

impl DeploymentConfig {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The object holding the component sections
    pub fn components(&self) -> Option<&Map<String, Value>> {
        match self.0.get("components") {
            Some(Value::Object(components)) => Some(components),
            _ => self.0.as_object(),
        }
    }

    fn components_mut(&mut self) -> Option<&mut Map<String, Value>> {
        if matches!(self.0.get("components"), Some(Value::Object(_))) {
            self.0.get_mut("components").and_then(Value::as_object_mut)
        } else {
            self.0.as_object_mut()
        }
    }

    /// Keys of the component sections present in the config
    pub fn component_keys(&self) -> Vec<String> {
        self.components()
            .map(|components| {
                components
                    .iter()
                    .filter(|(key, value)| key.as_str() != "auth" && value.is_object())
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_component(&self, key: &str) -> bool {
        self.component_keys().iter().any(|k| k == key)
    }

    /// Parameter query filters for every section naming a package and version
    pub fn parameter_filters(&self) -> Vec<ParameterFilter> {
        let Some(components) = self.components() else {
            return Vec::new();
        };

        components
            .iter()
            .filter(|(key, _)| key.as_str() != "auth")
            .filter_map(|(key, section)| {
                let version = section.get("version")?.as_str()?;
                let component = section
                    .get("component")
                    .and_then(Value::as_str)
                    .unwrap_or(key.as_str());
                Some(ParameterFilter {
                    component: component.to_string(),
                    version: version.to_string(),
                    is_essential_only: false,
                })
            })
            .collect()
    }

    /// Write edited parameters into each component's `parameters` list
    pub fn apply_parameters(&mut self, metas: &[NewParameterMeta]) -> Result<(), WizardError> {
        let components = self
            .components_mut()
            .ok_or_else(|| WizardError::ConfigError("deployment config is not an object".into()))?;

        for meta in metas {
            let changed = meta.changed_parameters();
            if changed.is_empty() {
                continue;
            }

            let Some(section) = components
                .get_mut(&meta.component_key)
                .and_then(Value::as_object_mut)
            else {
                warn!(
                    "Component {} is not part of the deployment, skipping {} parameters",
                    meta.component_key,
                    changed.len()
                );
                continue;
            };

            let parameters = section
                .entry("parameters")
                .or_insert_with(|| Value::Array(Vec::new()));
            let Some(list) = parameters.as_array_mut() else {
                return Err(WizardError::ConfigError(format!(
                    "{}.parameters is not a list",
                    meta.component_key
                )));
            };

            for parameter in changed {
                list.retain(|entry| {
                    entry.get("key").and_then(Value::as_str) != Some(parameter.key.as_str())
                });
                list.push(serde_json::to_value(&parameter)?);
            }
        }

        Ok(())
    }
}

/// Input of a non-interactive wizard run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Deployment name
    pub name: String,

    /// Wizard flow to drive
    #[serde(default)]
    pub flow: Flow,

    /// Whether OCP Express is part of the deployment; derived from the
    /// config when absent
    #[serde(default)]
    pub select_ocpexpress: Option<bool>,

    /// Deployment configuration
    pub config: DeploymentConfig,

    /// Parameter overrides, `component -> parameter -> value`
    #[serde(default)]
    pub overrides: BTreeMap<String, BTreeMap<String, String>>,

    /// Components to remove (component removal flow)
    #[serde(default)]
    pub remove_components: Vec<String>,
}

impl DeploymentPlan {
    pub fn select_ocpexpress(&self) -> bool {
        self.select_ocpexpress.unwrap_or_else(|| {
            self.config
                .component_keys()
                .iter()
                .any(|key| canonical_key(key) == OCPEXPRESS)
        })
    }
}
