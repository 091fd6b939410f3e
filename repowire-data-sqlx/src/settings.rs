use repowire_core::{ConfigError, RepowireConfig};

const DEFAULT_CONNECTIONS: u32 = 5;

/// One `data.managers.<name>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSettings {
    pub name: String,
    pub url: String,
    pub connections: u32,
}

impl ManagerSettings {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            connections: DEFAULT_CONNECTIONS,
        }
    }

    pub fn connections(mut self, connections: u32) -> Self {
        self.connections = connections;
        self
    }
}

/// The `data` section of the configuration:
///
/// ```yaml
/// data:
///   default: primary
///   managers:
///     primary:
///       url: "sqlite::memory:"
///       connections: 1
///   routes:
///     AuditLog: reporting
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSettings {
    pub default: Option<String>,
    pub managers: Vec<ManagerSettings>,
    pub routes: Vec<(String, String)>,
}

impl DataSettings {
    /// Read the `data.*` keys.
    ///
    /// Without `data.default`, a lone manager becomes the default. Every
    /// route and the default must name a configured manager.
    pub fn from_config(config: &RepowireConfig) -> Result<Self, ConfigError> {
        let mut managers = Vec::new();
        for name in config.children("data.managers") {
            let url = config.get::<String>(&format!("data.managers.{name}.url"))?;
            let connections = config
                .get_opt::<u32>(&format!("data.managers.{name}.connections"))?
                .unwrap_or(DEFAULT_CONNECTIONS);
            managers.push(ManagerSettings {
                name,
                url,
                connections,
            });
        }

        let default = match config.get_opt::<String>("data.default")? {
            Some(name) => Some(name),
            None if managers.len() == 1 => Some(managers[0].name.clone()),
            None => None,
        };

        let mut routes = Vec::new();
        for entity in config.children("data.routes") {
            let manager = config.get::<String>(&format!("data.routes.{entity}"))?;
            routes.push((entity, manager));
        }

        let settings = Self {
            default,
            managers,
            routes,
        };
        settings.check_references()?;
        Ok(settings)
    }

    fn check_references(&self) -> Result<(), ConfigError> {
        let known = |name: &str| self.managers.iter().any(|m| m.name == name);
        if let Some(default) = self.default.as_deref().filter(|d| !known(d)) {
            return Err(ConfigError::NotFound(format!("data.managers.{default}")));
        }
        if let Some((entity, manager)) = self.routes.iter().find(|(_, m)| !known(m)) {
            return Err(ConfigError::TypeMismatch {
                key: format!("data.routes.{entity}"),
                message: format!("route points to unknown manager '{manager}'"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_managers_routes_and_default() {
        let config = RepowireConfig::from_yaml_str(
            r#"
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
"#,
            "test",
        )
        .unwrap();
        let settings = DataSettings::from_config(&config).unwrap();
        assert_eq!(settings.default.as_deref(), Some("primary"));
        assert_eq!(
            settings.managers,
            vec![
                ManagerSettings::new("primary", "sqlite::memory:").connections(1),
                ManagerSettings::new("reporting", "sqlite://reports.db"),
            ]
        );
        assert_eq!(
            settings.routes,
            vec![("AuditLog".to_string(), "reporting".to_string())]
        );
    }

    #[test]
    fn lone_manager_is_the_default() {
        let mut config = RepowireConfig::empty();
        config.set("data.managers.main.url", "sqlite::memory:");
        let settings = DataSettings::from_config(&config).unwrap();
        assert_eq!(settings.default.as_deref(), Some("main"));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut config = RepowireConfig::empty();
        config.set("data.managers.main.url", "sqlite::memory:");
        config.set("data.routes.User", "elsewhere");
        assert!(matches!(
            DataSettings::from_config(&config),
            Err(ConfigError::TypeMismatch { .. })
        ));

        let mut config = RepowireConfig::empty();
        config.set("data.managers.main.url", "sqlite::memory:");
        config.set("data.default", "missing");
        assert!(matches!(
            DataSettings::from_config(&config),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn manager_without_url_is_an_error() {
        let mut config = RepowireConfig::empty();
        config.set("data.managers.main.connections", 2);
        assert!(matches!(
            DataSettings::from_config(&config),
            Err(ConfigError::NotFound(key)) if key == "data.managers.main.url"
        ));
    }
}
