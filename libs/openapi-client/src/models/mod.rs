//! API models

use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` as the field's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response envelope wrapped around every installer endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    pub data: Option<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    pub success: bool,
}

/// Paged list payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataList<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<T>,
}

/// Service identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Keep-alive request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepAliveRequest {
    pub token: String,
    pub overwrite: bool,
}

/// RSA public key response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

// =============================== COMPONENTS ================================== //

/// Version entry of a component package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentVersion {
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub md5: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_size: u64,
}

/// Component and its available versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: Vec<ComponentVersion>,
}

/// Filter entry for the parameter query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterFilter {
    pub component: String,
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_essential_only: bool,
}

/// Parameter query body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRequest {
    pub filters: Vec<ParameterFilter>,
}

/// Type tag of a configurable parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ParameterType {
    Integer,
    #[default]
    String,
    Capacity,
    CapacityMB,
    Boolean,
    /// Any tag the wizard does not treat specially
    Other(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterType::Integer => "Integer",
            ParameterType::String => "String",
            ParameterType::Capacity => "Capacity",
            ParameterType::CapacityMB => "CapacityMB",
            ParameterType::Boolean => "Boolean",
            ParameterType::Other(tag) => tag,
        }
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, ParameterType::Capacity | ParameterType::CapacityMB)
    }
}

impl std::str::FromStr for ParameterType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Integer" => ParameterType::Integer,
            "String" => ParameterType::String,
            "Capacity" => ParameterType::Capacity,
            "CapacityMB" => ParameterType::CapacityMB,
            "Boolean" => ParameterType::Boolean,
            other => ParameterType::Other(other.to_string()),
        })
    }
}

impl Serialize for ParameterType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParameterType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A configurable setting of one component, as described by the service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigParameter {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub default: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub param_type: ParameterType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub require: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub auto: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub min_value: Option<String>,
    #[serde(default)]
    pub max_value: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub need_restart: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub need_reload: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub need_redeploy: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_essential: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub section: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_changed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_disable: bool,
}

/// Parameter metadata of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMeta {
    pub component: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config_parameters: Vec<ConfigParameter>,
}

// =============================== TASKS ================================== //

/// State of a long running task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[default]
    Running,
    Successful,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Successful | TaskState::Failed)
    }
}

/// Per-component progress entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTaskInfo {
    pub component: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: TaskState,
}

/// Install / upgrade / change task status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finished: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: Vec<ComponentTaskInfo>,
}

/// Single precheck item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckItem {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub server: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recoverable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub advisement: Option<String>,
}

impl PrecheckItem {
    pub fn is_failed(&self) -> bool {
        self.result.eq_ignore_ascii_case("FAILED")
    }
}

/// Precheck task status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrecheckStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finished: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_passed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: Vec<PrecheckItem>,
}

/// Install log chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskLog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub log: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub offset: u64,
}

/// Parameter rolled back by the recover endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverChange {
    pub name: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

// =============================== DEPLOYMENTS ================================== //

/// Deployment summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub components: Vec<String>,
}

/// Connection details of a deployed component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub component: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub access_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connect_url: String,
}

/// Installation report entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskState,
}
