use crate::config::{parse_flag, ConfigError, ConfigSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Environment variable toggling scope validation
pub const VALIDATE_SCOPES_VAR: &str = "CONTAINER_VALIDATE_SCOPES";
/// Environment variable toggling eager validation in `build_with_options`
pub const VALIDATE_ON_BUILD_VAR: &str = "CONTAINER_VALIDATE_ON_BUILD";
/// Environment variable bounding the depth of a factory chain
pub const MAX_RESOLUTION_DEPTH_VAR: &str = "CONTAINER_MAX_RESOLUTION_DEPTH";

const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 64;

/// Configuration trait for container settings
pub trait ConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Options applied when a service collection is turned into a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Reject resolution of scoped services from the root provider
    pub validate_scopes: bool,
    /// Reject descriptors without an implementation source at build time
    pub validate_on_build: bool,
    /// Longest chain of nested factory invocations before resolution fails
    pub max_resolution_depth: usize,
}

impl ContainerOptions {
    /// Create the default, permissive options
    pub fn new() -> Self {
        Self {
            validate_scopes: false,
            validate_on_build: false,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
        }
    }

    /// Options suited to tests: every check switched on
    pub fn strict() -> Self {
        Self {
            validate_scopes: true,
            validate_on_build: true,
            ..Self::new()
        }
    }

    pub fn with_validate_scopes(mut self, enabled: bool) -> Self {
        self.validate_scopes = enabled;
        self
    }

    pub fn with_validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// Load options from a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTrait for ContainerOptions {
    fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::new();

        if let Ok(value) = env::var(VALIDATE_SCOPES_VAR) {
            options.validate_scopes = parse_flag("validate_scopes", &value)?;
        }

        if let Ok(value) = env::var(VALIDATE_ON_BUILD_VAR) {
            options.validate_on_build = parse_flag("validate_on_build", &value)?;
        }

        if let Ok(value) = env::var(MAX_RESOLUTION_DEPTH_VAR) {
            options.max_resolution_depth = value.trim().parse().map_err(|_| {
                ConfigError::invalid_value("max_resolution_depth", &value, "a positive integer")
            })?;
        }

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::invalid_value(
                "max_resolution_depth",
                "0",
                "a positive integer",
            ));
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();

        let fields = [
            ("validate_scopes", VALIDATE_SCOPES_VAR, self.validate_scopes.to_string()),
            ("validate_on_build", VALIDATE_ON_BUILD_VAR, self.validate_on_build.to_string()),
            (
                "max_resolution_depth",
                MAX_RESOLUTION_DEPTH_VAR,
                self.max_resolution_depth.to_string(),
            ),
        ];

        for (field, var, value) in fields {
            let source = if env::var(var).is_ok() {
                ConfigSource::EnvVar(var.to_string())
            } else {
                ConfigSource::Default(value)
            };
            sources.insert(field.to_string(), source);
        }

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(VALIDATE_SCOPES_VAR);
        env::remove_var(VALIDATE_ON_BUILD_VAR);
        env::remove_var(MAX_RESOLUTION_DEPTH_VAR);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let options = ContainerOptions::from_env().unwrap();
        assert_eq!(options, ContainerOptions::default());

        let sources = options.config_sources();
        assert!(sources["validate_scopes"].is_default());
        assert!(sources["max_resolution_depth"].is_default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var(VALIDATE_SCOPES_VAR, "yes");
        env::set_var(MAX_RESOLUTION_DEPTH_VAR, "8");

        let options = ContainerOptions::from_env().unwrap();
        assert!(options.validate_scopes);
        assert!(!options.validate_on_build);
        assert_eq!(options.max_resolution_depth, 8);

        let sources = options.config_sources();
        assert_eq!(
            sources["validate_scopes"],
            ConfigSource::EnvVar(VALIDATE_SCOPES_VAR.to_string())
        );
        assert!(sources["validate_on_build"].is_default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_values() {
        clear_env();
        env::set_var(MAX_RESOLUTION_DEPTH_VAR, "0");
        assert!(ContainerOptions::from_env().is_err());

        env::set_var(MAX_RESOLUTION_DEPTH_VAR, "deep");
        assert!(ContainerOptions::from_env().is_err());

        clear_env();
        env::set_var(VALIDATE_ON_BUILD_VAR, "sometimes");
        assert!(ContainerOptions::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_from_yaml_str() {
        let options = ContainerOptions::from_yaml_str("validate_scopes: true\n").unwrap();
        assert!(options.validate_scopes);
        assert_eq!(options.max_resolution_depth, DEFAULT_MAX_RESOLUTION_DEPTH);

        assert!(ContainerOptions::from_yaml_str("max_resolution_depth: 0\n").is_err());
        assert!(matches!(
            ContainerOptions::from_yaml_str("validate_scopes: [1, 2]\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_strict_options() {
        let options = ContainerOptions::strict();
        assert!(options.validate_scopes);
        assert!(options.validate_on_build);
        assert!(options.validate().is_ok());
    }
}
