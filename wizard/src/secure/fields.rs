//! Secret fields encrypted before a deployment config leaves the wizard

use serde_json::Value;

/// Where a secret lives in a deployment config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretField {
    /// JSON pointer from the config root
    Root(&'static str),

    /// JSON pointer from the components root
    Component(&'static str),

    /// `value` of every `parameters` entry of `component` whose key is `key`
    ComponentParameter {
        component: &'static str,
        key: &'static str,
    },
}

/// Every field encrypted on submission
pub const SECRET_FIELDS: &[SecretField] = &[
    SecretField::Root("/auth/password"),
    SecretField::ComponentParameter {
        component: "obagent",
        key: "http_basic_auth_password",
    },
    SecretField::ComponentParameter {
        component: "obproxy",
        key: "obproxy_sys_password",
    },
    SecretField::Component("/oceanbase/root_password"),
    SecretField::Component("/ocpserver/admin_password"),
    SecretField::Component("/ocpserver/meta_tenant/password"),
    SecretField::Component("/ocpserver/monitor_tenant/password"),
    SecretField::Component("/ocpserver/metadb/password"),
    SecretField::Component("/ocpexpress/admin_passwd"),
    SecretField::Component("/obproxy/obproxy_sys_password"),
];

impl SecretField {
    /// Mutable slots holding this secret in `config`
    pub fn locate<'a>(&self, config: &'a mut Value) -> Vec<&'a mut Value> {
        let prefix = if config.get("components").is_some_and(Value::is_object) {
            "/components"
        } else {
            ""
        };

        match self {
            SecretField::Root(pointer) => config.pointer_mut(pointer).into_iter().collect(),
            SecretField::Component(pointer) => config
                .pointer_mut(&format!("{}{}", prefix, pointer))
                .into_iter()
                .collect(),
            SecretField::ComponentParameter { component, key } => {
                let pointer = format!("{}/{}/parameters", prefix, component);
                match config.pointer_mut(&pointer).and_then(Value::as_array_mut) {
                    Some(entries) => entries
                        .iter_mut()
                        .filter(|entry| entry.get("key").and_then(Value::as_str) == Some(*key))
                        .filter_map(|entry| entry.get_mut("value"))
                        .collect(),
                    None => Vec::new(),
                }
            }
        }
    }
}
