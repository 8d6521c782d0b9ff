//! Process-wide container facade
//!
//! Application code should prefer passing a [`ServiceProvider`] down from
//! its composition root. The facade exists for call sites that cannot be
//! reached that way, such as host callbacks registered once at startup.
//!
//! `configure` fully replaces prior state: the identifier registry is reset,
//! a fresh collection is populated by the setup callback and the resulting
//! provider becomes current. Providers handed out before a reconfiguration
//! stop resolving anything, because their tokens were forgotten.

use std::sync::{Arc, OnceLock, RwLock};

use crate::config::ContainerOptions;
use crate::container::builder::ServiceCollection;
use crate::container::descriptor::ServiceKey;
use crate::container::provider::ServiceProvider;
use crate::container::resolver::Resolve;
use crate::container::scope::ServiceScope;
use crate::container::tokens::TokenRegistry;
use crate::errors::CoreError;

static PROVIDER: RwLock<Option<ServiceProvider>> = RwLock::new(None);
static REGISTRY: OnceLock<Arc<TokenRegistry>> = OnceLock::new();

/// Static entry point over the current provider
#[derive(Debug, Clone, Copy, Default)]
pub struct Container;

impl Container {
    /// Configure the container with default options
    pub fn configure<F>(setup: F) -> Result<ServiceProvider, CoreError>
    where
        F: FnOnce(&mut ServiceCollection),
    {
        Self::configure_with_options(ContainerOptions::default(), setup)
    }

    /// Configure the container, replacing any previous configuration
    pub fn configure_with_options<F>(
        options: ContainerOptions,
        setup: F,
    ) -> Result<ServiceProvider, CoreError>
    where
        F: FnOnce(&mut ServiceCollection),
    {
        let registry = Self::token_registry();
        registry.reset();

        let mut services = ServiceCollection::with_registry(registry);
        setup(&mut services);
        let built = services.build_with_options(options);

        let mut current = PROVIDER
            .write()
            .map_err(|_| CoreError::lock_error("container_provider"))?;

        match built {
            Ok(provider) => {
                tracing::info!(
                    descriptors = provider.descriptor_count(),
                    "container configured"
                );
                *current = Some(provider.clone());
                Ok(provider)
            }
            Err(error) => {
                tracing::warn!(%error, "container configuration failed");
                *current = None;
                Err(error)
            }
        }
    }

    /// The current provider, for passing explicitly down the call graph
    pub fn provider() -> Result<ServiceProvider, CoreError> {
        PROVIDER
            .read()
            .map_err(|_| CoreError::lock_error("container_provider"))?
            .clone()
            .ok_or(CoreError::NotConfigured)
    }

    pub fn is_configured() -> bool {
        PROVIDER
            .read()
            .map(|current| current.is_some())
            .unwrap_or(false)
    }

    /// Drop the current provider and forget every identifier token
    pub fn reset() -> Result<(), CoreError> {
        let mut current = PROVIDER
            .write()
            .map_err(|_| CoreError::lock_error("container_provider"))?;
        *current = None;
        Self::token_registry().reset();
        tracing::debug!("container reset");
        Ok(())
    }

    /// The process-wide identifier registry
    pub fn token_registry() -> Arc<TokenRegistry> {
        REGISTRY
            .get_or_init(|| Arc::new(TokenRegistry::new()))
            .clone()
    }

    pub fn get_service<T>() -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Ok(Self::provider()?.get_service::<T>())
    }

    /// Alias of [`Container::get_service`]
    pub fn get<T>() -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::get_service::<T>()
    }

    pub fn get_required_service<T>() -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::provider()?.get_required_service::<T>()
    }

    /// Alias of [`Container::get_required_service`]
    pub fn resolve<T>() -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::get_required_service::<T>()
    }

    pub fn get_by_key<T>(key: &ServiceKey<T>) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Ok(Self::provider()?.get_by_key(key))
    }

    pub fn get_required_by_key<T>(key: &ServiceKey<T>) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::provider()?.get_required_by_key(key)
    }

    pub fn create_scope() -> Result<ServiceScope, CoreError> {
        Ok(Self::provider()?.create_scope())
    }
}
