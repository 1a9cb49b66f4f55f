//! Component alias table and hidden parameter keys

use std::borrow::Cow;
use std::collections::HashSet;

/// Static description of a deployable component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Canonical key used in deployment configs
    pub key: &'static str,

    /// Human label
    pub label: &'static str,

    /// Parameters managed elsewhere in the wizard
    pub hidden_keys: &'static [&'static str],
}

pub const OCEANBASE: &str = "oceanbase";
pub const OBPROXY: &str = "obproxy";
pub const OBAGENT: &str = "obagent";
pub const OCPEXPRESS: &str = "ocpexpress";
pub const OBCONFIGSERVER: &str = "obconfigserver";
pub const OCPSERVER: &str = "ocpserver";

/// Package names reported by the service, mapped to canonical keys
const COMPONENT_ALIASES: &[(&str, &str)] = &[
    ("oceanbase", OCEANBASE),
    ("oceanbase-ce", OCEANBASE),
    ("oceanbase-standalone", OCEANBASE),
    ("obproxy", OBPROXY),
    ("obproxy-ce", OBPROXY),
    ("obagent", OBAGENT),
    ("ocp-express", OCPEXPRESS),
    ("ocpexpress", OCPEXPRESS),
    ("ob-configserver", OBCONFIGSERVER),
    ("obconfigserver", OBCONFIGSERVER),
    ("ocp-server", OCPSERVER),
    ("ocp-server-ce", OCPSERVER),
    ("ocpserver", OCPSERVER),
];

const COMPONENTS: &[ComponentSpec] = &[
    ComponentSpec {
        key: OCEANBASE,
        label: "OceanBase",
        hidden_keys: &[
            "home_path",
            "data_dir",
            "redo_dir",
            "mysql_port",
            "rpc_port",
            "obshell_port",
            "root_password",
            "appname",
            "production_mode",
        ],
    },
    ComponentSpec {
        key: OBPROXY,
        label: "OBProxy",
        hidden_keys: &[
            "home_path",
            "listen_port",
            "prometheus_listen_port",
            "rpc_listen_port",
            "obproxy_sys_password",
        ],
    },
    ComponentSpec {
        key: OBAGENT,
        label: "OBAgent",
        hidden_keys: &[
            "home_path",
            "monagent_http_port",
            "mgragent_http_port",
            "http_basic_auth_password",
        ],
    },
    ComponentSpec {
        key: OCPEXPRESS,
        label: "OCP Express",
        hidden_keys: &["home_path", "port", "admin_passwd"],
    },
    ComponentSpec {
        key: OBCONFIGSERVER,
        label: "OBConfigServer",
        hidden_keys: &["home_path", "listen_port"],
    },
    ComponentSpec {
        key: OCPSERVER,
        label: "OCP",
        hidden_keys: &["home_path", "port", "admin_password", "soft_dir", "log_dir"],
    },
];

/// OceanBase parameters that only matter when OCP Express is deployed
pub const OCPEXPRESS_ONLY_KEYS: &[&str] = &[
    "ocp_meta_tenant_max_cpu",
    "ocp_meta_tenant_memory_size",
    "ocp_meta_tenant_log_disk_size",
    "ocp_meta_username",
    "ocp_meta_password",
    "ocp_meta_db",
    "ocp_monitor_tenant_max_cpu",
    "ocp_monitor_tenant_memory_size",
    "ocp_monitor_tenant_log_disk_size",
];

/// Canonical key for a component name; unknown names map to themselves
pub fn canonical_key(name: &str) -> Cow<'static, str> {
    COMPONENT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, key)| Cow::Borrowed(*key))
        .unwrap_or_else(|| Cow::Owned(name.to_string()))
}

/// Label and hidden keys of a canonical key
pub fn component_spec(key: &str) -> Option<&'static ComponentSpec> {
    COMPONENTS.iter().find(|spec| spec.key == key)
}

/// Display label for a canonical key
pub fn label_for(key: &str) -> String {
    component_spec(key)
        .map(|spec| spec.label.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Hidden keys for a canonical key, widened when OCP Express is not selected
pub fn hidden_keys(key: &str, select_ocpexpress: bool) -> HashSet<&'static str> {
    let mut hidden: HashSet<&'static str> = component_spec(key)
        .map(|spec| spec.hidden_keys.iter().copied().collect())
        .unwrap_or_default();

    if key == OCEANBASE && !select_ocpexpress {
        hidden.extend(OCPEXPRESS_ONLY_KEYS.iter().copied());
    }

    hidden
}
