//! Session keys, record states and the registry document format.

use std::path::PathBuf;

use cnd_state::models::manifest::DevEnvironment;
use cnd_state::models::session::{
    Registry, SessionKey, SessionRecord, SessionState, SCHEMA_VERSION,
};

fn dev(name: &str, container: &str) -> DevEnvironment {
    let mut dev = DevEnvironment::default();
    dev.swap.deployment.name = name.into();
    dev.swap.deployment.container = container.into();
    dev
}

#[test]
fn key_joins_namespace_deployment_and_container() {
    let key = SessionKey::new("default", &dev("web", "app"));
    assert_eq!(key.as_str(), "default/web/app");
    assert_eq!(key.to_string(), "default/web/app");
}

#[test]
fn keys_differ_when_any_component_differs() {
    let base = SessionKey::new("default", &dev("web", "app"));

    assert_ne!(base, SessionKey::new("staging", &dev("web", "app")));
    assert_ne!(base, SessionKey::new("default", &dev("api", "app")));
    assert_ne!(base, SessionKey::new("default", &dev("web", "worker")));
}

#[test]
fn record_state_follows_agent_handle() {
    let active = SessionRecord::new(PathBuf::from("/src"), "host:1234");
    let stopped = SessionRecord::new(PathBuf::from("/src"), "");

    assert_eq!(active.state(), SessionState::Active);
    assert_eq!(stopped.state(), SessionState::Stopped);
}

#[test]
fn only_a_different_live_handle_conflicts() {
    let active = SessionRecord::new(PathBuf::from("/src"), "host:1234");
    let stopped = SessionRecord::new(PathBuf::from("/src"), "");
    let same_handle = SessionRecord::new(PathBuf::from("/other"), "host:1234");
    let other_handle = SessionRecord::new(PathBuf::from("/src"), "host:5555");

    assert!(active.conflicts_with(&other_handle));
    assert!(!active.conflicts_with(&same_handle));
    assert!(!stopped.conflicts_with(&other_handle));
}

#[test]
fn default_registry_is_empty_at_current_version() {
    let registry = Registry::default();
    assert_eq!(registry.schema_version, SCHEMA_VERSION);
    assert!(registry.sessions.is_empty());
}

#[test]
fn registry_serializes_with_camel_case_fields() {
    let mut registry = Registry::default();
    registry.sessions.insert(
        SessionKey::new("default", &dev("web", "app")),
        SessionRecord::new(PathBuf::from("/repo"), ""),
    );

    let yaml = serde_yaml::to_string(&registry).expect("serializes");

    assert!(yaml.contains("schemaVersion: '1.0'"), "{yaml}");
    assert!(yaml.contains("default/web/app:"), "{yaml}");
    assert!(yaml.contains("folder: /repo"), "{yaml}");
    assert!(yaml.contains("agentHandle: ''"), "{yaml}");
}

#[test]
fn legacy_field_names_are_accepted() {
    let legacy = "version: '1.0'\nservices:\n  default/web/app:\n    folder: /repo\n    syncthing: host:1234\n";

    let registry: Registry = serde_yaml::from_str(legacy).expect("legacy document decodes");
    let record = registry
        .sessions
        .get(&SessionKey::new("default", &dev("web", "app")))
        .expect("record present");

    assert_eq!(registry.schema_version, "1.0");
    assert_eq!(record.folder, PathBuf::from("/repo"));
    assert_eq!(record.agent_handle, "host:1234");
}
