//! Configuration resolution from the environment and TOML overrides.

use std::path::PathBuf;

use serial_test::serial;

use cnd_state::config::{CND_HOME_ENV, TOOL_DIR_NAME};
use cnd_state::{AppError, GlobalConfig};

#[test]
fn defaults_live_under_home() {
    let config = GlobalConfig::with_home("/home/u");

    assert_eq!(config.home_dir, PathBuf::from("/home/u"));
    assert_eq!(config.cnd_home, PathBuf::from("/home/u").join(TOOL_DIR_NAME));
    assert_eq!(config.state_path(), PathBuf::from("/home/u/.cnd/.state"));
    assert_eq!(config.default_namespace, "default");
}

#[test]
fn toml_overrides_replace_defaults() {
    let mut config = GlobalConfig::with_home("/home/u");
    config
        .apply_toml_str(
            r#"
cnd_home = "/var/lib/cnd"
state_file = "sessions.yml"
home_dir = "/home/other"
default_namespace = "dev"
"#,
        )
        .expect("overrides apply");

    assert_eq!(config.state_path(), PathBuf::from("/var/lib/cnd/sessions.yml"));
    assert_eq!(config.home_dir, PathBuf::from("/home/other"));
    assert_eq!(config.default_namespace, "dev");
}

#[test]
fn empty_toml_keeps_defaults() {
    let mut config = GlobalConfig::with_home("/home/u");
    config.apply_toml_str("").expect("empty overrides apply");
    assert_eq!(config, GlobalConfig::with_home("/home/u"));
}

#[test]
fn unknown_keys_are_rejected() {
    let mut config = GlobalConfig::with_home("/home/u");
    let err = config.apply_toml_str("state_path = \"/x\"").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn state_file_must_be_a_plain_name() {
    let mut config = GlobalConfig::with_home("/home/u");
    let err = config.apply_toml_str("state_file = \"../escape\"").unwrap_err();
    assert_eq!(err.to_string(), "config: state_file must be a plain file name");
}

#[test]
fn empty_namespace_is_rejected() {
    let mut config = GlobalConfig::with_home("/home/u");
    let err = config.apply_toml_str("default_namespace = \"\"").unwrap_err();
    assert!(err.to_string().contains("default_namespace"));
}

#[test]
#[serial]
fn from_env_reads_home_and_tool_override() {
    let previous_home = std::env::var_os("HOME");
    let previous_cnd = std::env::var_os(CND_HOME_ENV);

    std::env::set_var("HOME", "/home/envuser");
    std::env::remove_var(CND_HOME_ENV);
    let config = GlobalConfig::from_env().expect("config from env");
    assert_eq!(config.state_path(), PathBuf::from("/home/envuser/.cnd/.state"));

    std::env::set_var(CND_HOME_ENV, "/opt/cnd");
    let config = GlobalConfig::from_env().expect("config from env");
    assert_eq!(config.state_path(), PathBuf::from("/opt/cnd/.state"));
    assert_eq!(config.home_dir, PathBuf::from("/home/envuser"));

    match previous_home {
        Some(value) => std::env::set_var("HOME", value),
        None => std::env::remove_var("HOME"),
    }
    match previous_cnd {
        Some(value) => std::env::set_var(CND_HOME_ENV, value),
        None => std::env::remove_var(CND_HOME_ENV),
    }
}

#[test]
#[serial]
fn load_from_path_applies_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "state_file = \"custom\"\n").expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("config loads");
    assert!(config.state_path().ends_with("custom"));
}

#[test]
fn load_from_missing_path_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = GlobalConfig::load_from_path(temp.path().join("missing.toml")).unwrap_err();
    assert!(err.to_string().starts_with("config: failed to read config"));
}
