//! Dependency injection container for the taskpilot extension
//!
//! Registrations are collected in a [`ServiceCollection`], frozen into a
//! [`ServiceProvider`], and resolved either from the provider or from a
//! [`ServiceScope`] created around a unit of work. Wiring is explicit:
//! factories receive a [`container::Resolver`] and pull their own
//! dependencies from it.

pub mod config;
pub mod container;
pub mod errors;

pub use config::{ConfigError, ConfigSource, ConfigTrait, ContainerOptions};
pub use container::{
    Container, Implementation, Resolve, ServiceCollection, ServiceId, ServiceKey,
    ServiceLifetime, ServiceProvider, ServiceScope, ServiceToken,
};
pub use errors::CoreError;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
