use std::collections::HashMap;

use repowire_core::config::{ConfigError, RepowireConfig};
use serial_test::serial;

const YAML: &str = r#"
data:
  default: primary
  managers:
    primary:
      url: "sqlite::memory:"
      connections: 1
    reporting:
      url: "sqlite://reports.db"
  routes:
    AuditLog: reporting
"#;

#[test]
fn empty_config_has_no_keys() {
    let config = RepowireConfig::empty();
    assert!(matches!(
        config.get::<String>("data.default"),
        Err(ConfigError::NotFound(_))
    ));
    assert_eq!(config.profile(), "test");
}

#[test]
fn typed_reads_from_yaml() {
    let config = RepowireConfig::from_yaml_str(YAML, "test").unwrap();
    assert_eq!(config.get::<String>("data.default").unwrap(), "primary");
    assert_eq!(config.get::<u32>("data.managers.primary.connections").unwrap(), 1);
    assert_eq!(
        config.get::<String>("data.managers.reporting.url").unwrap(),
        "sqlite://reports.db"
    );

    let routes: HashMap<String, String> = config.get("data.routes").unwrap();
    assert_eq!(routes.get("AuditLog").map(String::as_str), Some("reporting"));
}

#[test]
fn type_mismatch_is_reported() {
    let config = RepowireConfig::from_yaml_str(YAML, "test").unwrap();
    let err = config.get::<u32>("data.default").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch { .. }), "{err}");
}

#[test]
fn optional_and_default_reads() {
    let config = RepowireConfig::from_yaml_str(YAML, "test").unwrap();
    assert_eq!(
        config.get_opt::<u32>("data.managers.reporting.connections").unwrap(),
        None
    );
    assert_eq!(config.get_or("data.managers.reporting.connections", 5u32), 5);
    assert!(config.contains_key("data.routes.AuditLog"));
}

#[test]
fn children_lists_section_names() {
    let config = RepowireConfig::from_yaml_str(YAML, "test").unwrap();
    assert_eq!(config.children("data.managers"), vec!["primary", "reporting"]);
    assert_eq!(config.children("data.routes"), vec!["AuditLog"]);
    assert!(config.children("data.missing").is_empty());
}

#[test]
fn set_overrides_values() {
    let mut config = RepowireConfig::from_yaml_str(YAML, "test").unwrap();
    config.set("data.default", "reporting");
    assert_eq!(config.get::<String>("data.default").unwrap(), "reporting");
}

#[test]
#[serial]
fn load_from_layers_profile_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("application.yaml"), YAML).unwrap();
    std::fs::write(
        dir.path().join("application-prod.yaml"),
        "data:\n  managers:\n    primary:\n      connections: 8\n",
    )
    .unwrap();

    std::env::set_var("DATA_MANAGERS_REPORTING_CONNECTIONS", "3");
    let config = RepowireConfig::load_from(dir.path(), "prod");
    std::env::remove_var("DATA_MANAGERS_REPORTING_CONNECTIONS");
    let config = config.unwrap();

    assert_eq!(config.get::<u32>("data.managers.primary.connections").unwrap(), 8);
    assert_eq!(config.get::<u32>("data.managers.reporting.connections").unwrap(), 3);
    assert_eq!(
        config.get::<String>("data.managers.primary.url").unwrap(),
        "sqlite::memory:"
    );
}

#[test]
#[serial]
fn profile_env_var_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("application-staging.yaml"), "data:\n  default: staging\n").unwrap();

    std::env::set_var("REPOWIRE_PROFILE", "staging");
    let config = RepowireConfig::load_from(dir.path(), "dev");
    std::env::remove_var("REPOWIRE_PROFILE");
    let config = config.unwrap();

    assert_eq!(config.profile(), "staging");
    assert_eq!(config.get::<String>("data.default").unwrap(), "staging");
}

#[test]
fn malformed_yaml_fails_to_load() {
    let err = RepowireConfig::from_yaml_str("data: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
