use thiserror::Error;

use crate::config::ConfigError;
use crate::container::ServiceLifetime;

/// Core error type for the taskpilot container
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Container is not configured: call Container::configure before resolving services")]
    NotConfigured,

    #[error("Service not registered: {service}")]
    ServiceNotRegistered { service: String },

    #[error(
        "No implementation source registered for '{service}' and the identifier is not \
         self-constructible"
    )]
    AmbiguousImplementation { service: String },

    #[error("Circular dependency detected: {path} (cycle at: {cycle_service})")]
    CircularDependency { path: String, cycle_service: String },

    #[error("Resolution of '{service}' exceeded the maximum depth of {max_depth}")]
    ResolutionDepthExceeded { service: String, max_depth: usize },

    #[error("Scoped service '{service}' cannot be resolved from the root provider")]
    ScopedFromRoot { service: String },

    #[error("Scope {scope_id} has been disposed")]
    ScopeDisposed { scope_id: String },

    #[error("Service '{service}' does not hold an instance of '{expected}'")]
    ServiceTypeMismatch { service: String, expected: String },

    #[error("Invalid service lifetime: {lifetime}")]
    InvalidLifetime { lifetime: String },

    #[error("Factory for '{service}' failed: {source}")]
    FactoryFailed {
        service: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl CoreError {
    /// Create a new service not registered error
    pub fn service_not_registered(service: impl Into<String>) -> Self {
        Self::ServiceNotRegistered {
            service: service.into(),
        }
    }

    /// Create a new ambiguous implementation error
    pub fn ambiguous_implementation(service: impl Into<String>) -> Self {
        Self::AmbiguousImplementation {
            service: service.into(),
        }
    }

    /// Create an error for a pre-built instance registered with a non-singleton lifetime
    pub fn instance_requires_singleton(
        service: impl std::fmt::Display,
        lifetime: ServiceLifetime,
    ) -> Self {
        Self::InvalidLifetime {
            lifetime: format!("{lifetime} registration of '{service}' holds a pre-built instance"),
        }
    }

    /// Create a new lock error for the named resource
    pub fn lock_error(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Wrap an application error raised inside a factory
    pub fn factory_failed(
        service: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::FactoryFailed {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Check if the error is a not configured error
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }

    /// Check if the error is a service not registered error
    pub fn is_service_not_registered(&self) -> bool {
        matches!(self, Self::ServiceNotRegistered { .. })
    }

    /// Check if the error is an ambiguous implementation error
    pub fn is_ambiguous_implementation(&self) -> bool {
        matches!(self, Self::AmbiguousImplementation { .. })
    }

    /// Check if the error is a circular dependency error
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error is an invalid lifetime error
    pub fn is_invalid_lifetime(&self) -> bool {
        matches!(self, Self::InvalidLifetime { .. })
    }

    /// Check if the error comes from resolving through a disposed scope
    pub fn is_scope_disposed(&self) -> bool {
        matches!(self, Self::ScopeDisposed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_service() {
        let error = CoreError::service_not_registered("app::Logger");
        assert_eq!(error.to_string(), "Service not registered: app::Logger");
        assert!(error.is_service_not_registered());

        let error = CoreError::ambiguous_implementation("app::WidgetToken");
        assert!(error.to_string().contains("app::WidgetToken"));
        assert!(error.is_ambiguous_implementation());
    }

    #[test]
    fn test_factory_failed_keeps_source() {
        let error = CoreError::factory_failed("app::Client", "connection refused");
        assert_eq!(
            error.to_string(),
            "Factory for 'app::Client' failed: connection refused"
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_instance_lifetime_error() {
        let error =
            CoreError::instance_requires_singleton("app::Widget", ServiceLifetime::Transient);
        assert!(error.is_invalid_lifetime());
        assert_eq!(
            error.to_string(),
            "Invalid service lifetime: transient registration of 'app::Widget' holds a pre-built \
             instance"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CoreError =
            ConfigError::invalid_value("max_resolution_depth", "0", "a positive integer").into();
        assert!(matches!(error, CoreError::Configuration(_)));
        assert!(!error.is_not_configured());
    }
}
