//! Parameter cache tests

use std::time::Duration;

use openapi_client::models::{ConfigParameter, ParameterMeta, ParameterType};

use obwizard::cache::parameters::{digest, ParameterCache};

fn create_test_meta(component: &str) -> ParameterMeta {
    let param = |name: &str, default: &str, param_type: ParameterType| ConfigParameter {
        name: name.to_string(),
        default: default.to_string(),
        param_type,
        ..Default::default()
    };

    ParameterMeta {
        component: component.to_string(),
        version: "4.2.1".to_string(),
        config_parameters: vec![
            param("memory_limit", "6GB", ParameterType::Capacity),
            param("ocp_meta_username", "meta", ParameterType::String),
            param("home_path", "/home/admin", ParameterType::String),
        ],
    }
}

#[test]
fn test_parameter_cache_hit() {
    let cache = ParameterCache::new(10);
    let metas = vec![create_test_meta("oceanbase-ce")];

    let first = cache.normalize(&metas, false);
    let second = cache.normalize(&metas, false);

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);

    let digest = digest(&metas, false).unwrap();
    let entry = cache.get(&digest).unwrap();
    assert_eq!(entry.metas, first);
}

#[test]
fn test_parameter_cache_keys_on_ocpexpress_selection() {
    let cache = ParameterCache::new(10);
    let metas = vec![create_test_meta("oceanbase-ce")];

    let without = cache.normalize(&metas, false);
    let with = cache.normalize(&metas, true);

    assert_eq!(cache.len(), 2);
    assert!(without[0].parameter("ocp_meta_username").is_none());
    assert!(with[0].parameter("ocp_meta_username").is_some());
    assert!(with[0].parameter("home_path").is_none());
}

#[test]
fn test_parameter_cache_eviction() {
    let cache = ParameterCache::new(2);

    for component in ["oceanbase-ce", "obproxy-ce", "obagent"] {
        cache.normalize(&[create_test_meta(component)], false);
        std::thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(cache.len(), 2);
    let oldest = digest(&[create_test_meta("oceanbase-ce")], false).unwrap();
    assert!(cache.get(&oldest).is_none());
}

#[test]
fn test_parameter_cache_clear() {
    let cache = ParameterCache::default();
    cache.normalize(&[create_test_meta("obagent")], false);
    assert!(!cache.is_empty());

    cache.clear();
    assert!(cache.is_empty());
}
