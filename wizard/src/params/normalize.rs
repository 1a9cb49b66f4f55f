//! Parameter normalization
//!
//! Turns the service's per-component parameter metadata into the editable
//! model used by the configuration steps. Normalization is a pure function
//! of the metadata and the OCP Express selection flag.

use std::collections::BTreeMap;

use openapi_client::models::{ConfigParameter, ParameterMeta, ParameterType};
use serde::{Deserialize, Serialize};

use crate::errors::WizardError;
use crate::params::components::{canonical_key, hidden_keys, label_for};
use crate::params::units::{get_no_unit_value, get_unit, is_take_unit, take_new_unit};

/// Editable value of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    pub value: String,
    pub default_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    pub adaptive: bool,
    pub auto: bool,
    pub require: bool,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub is_changed: bool,
}

impl ParameterValue {
    fn from_parameter(parameter: &ConfigParameter) -> Self {
        let default_unit = if parameter.param_type.is_capacity() {
            get_unit(&parameter.default).map(str::to_string)
        } else {
            None
        };

        Self {
            value: parameter.default.clone(),
            default_value: get_no_unit_value(Some(&parameter.default)),
            default_unit,
            adaptive: parameter.auto,
            auto: parameter.auto,
            require: parameter.require,
            param_type: parameter.param_type.clone(),
            is_changed: false,
        }
    }

    /// Explicit edit of the value
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.is_changed = true;
    }

    /// Explicit edit of a capacity value as magnitude plus unit
    pub fn set_capacity(&mut self, magnitude: &str, unit: &str) {
        self.set_value(take_new_unit(magnitude, unit));
    }

    /// Switch between the backend-derived value and a customized one
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.adaptive = adaptive;
        self.is_changed = true;
    }

    /// Adaptive or optional values are always valid, others need a value
    pub fn is_valid(&self) -> bool {
        self.adaptive || !self.require || !self.value.is_empty()
    }
}

/// Service parameter enriched with its editable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConfigParameter {
    #[serde(flatten)]
    pub parameter: ConfigParameter,
    #[serde(rename = "parameterValue")]
    pub parameter_value: ParameterValue,
}

impl NewConfigParameter {
    pub fn name(&self) -> &str {
        &self.parameter.name
    }
}

/// Parameter entry sent back inside a component's `parameters` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedParameter {
    pub key: String,
    pub value: String,
    pub adaptive: bool,
}

/// Normalized metadata of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParameterMeta {
    pub component: String,
    pub version: String,
    pub label: String,
    pub component_key: String,
    pub config_parameter: Vec<NewConfigParameter>,
}

impl NewParameterMeta {
    pub fn parameter(&self, name: &str) -> Option<&NewConfigParameter> {
        self.config_parameter.iter().find(|p| p.name() == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut NewConfigParameter> {
        self.config_parameter.iter_mut().find(|p| p.name() == name)
    }

    /// Entries edited by the operator, in submission form
    pub fn changed_parameters(&self) -> Vec<SubmittedParameter> {
        self.config_parameter
            .iter()
            .filter(|p| p.parameter_value.is_changed)
            .map(|p| SubmittedParameter {
                key: p.parameter.name.clone(),
                value: p.parameter_value.value.clone(),
                adaptive: p.parameter_value.adaptive,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        match self
            .config_parameter
            .iter()
            .find(|p| !p.parameter_value.is_valid())
        {
            Some(p) => Err(WizardError::ValidationError(format!(
                "{}.{} is required when customized",
                self.component_key,
                p.name()
            ))),
            None => Ok(()),
        }
    }
}

/// Normalize the service metadata into editable per-component parameters
pub fn normalize(metas: &[ParameterMeta], select_ocpexpress: bool) -> Vec<NewParameterMeta> {
    metas
        .iter()
        .map(|meta| {
            let component_key = canonical_key(&meta.component).into_owned();
            let hidden = hidden_keys(&component_key, select_ocpexpress);

            let config_parameter = meta
                .config_parameters
                .iter()
                .filter(|p| !hidden.contains(p.name.as_str()))
                .map(|p| {
                    let mut parameter = p.clone();
                    if parameter.name == "cluster_id" {
                        parameter.default = "0".to_string();
                    }
                    let parameter_value = ParameterValue::from_parameter(&parameter);
                    NewConfigParameter {
                        parameter,
                        parameter_value,
                    }
                })
                .collect();

            NewParameterMeta {
                component: meta.component.clone(),
                version: meta.version.clone(),
                label: label_for(&component_key),
                component_key,
                config_parameter,
            }
        })
        .collect()
}

/// Validate every normalized parameter, reporting the first failure
pub fn validate_all(metas: &[NewParameterMeta]) -> Result<(), WizardError> {
    metas.iter().try_for_each(NewParameterMeta::validate)
}

/// Apply operator overrides (`component -> parameter -> value`) as explicit edits
///
/// Components may be named by package name or canonical key. A capacity
/// override given without a unit takes the parameter's default unit.
pub fn apply_overrides(
    metas: &mut [NewParameterMeta],
    overrides: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<(), WizardError> {
    for (component, values) in overrides {
        let key = canonical_key(component);
        let meta = metas
            .iter_mut()
            .find(|m| m.component_key == key)
            .ok_or_else(|| WizardError::NotFound(format!("component {}", component)))?;

        for (name, value) in values {
            let parameter = meta.parameter_mut(name).ok_or_else(|| {
                WizardError::NotFound(format!("editable parameter {}.{}", component, name))
            })?;
            let parameter_value = &mut parameter.parameter_value;

            parameter_value.set_adaptive(false);
            match parameter_value.default_unit.clone() {
                Some(unit) if !is_take_unit(value) && !value.is_empty() => {
                    parameter_value.set_capacity(value, &unit)
                }
                _ => parameter_value.set_value(value.clone()),
            }
        }
    }
    Ok(())
}
