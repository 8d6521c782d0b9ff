use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::ContainerOptions;
use crate::container::descriptor::{Instance, ServiceDescriptor, ServiceId};
use crate::container::resolver::{Resolve, Resolver};
use crate::container::tokens::{Token, TokenRegistry};
use crate::errors::CoreError;

struct ProviderState {
    registry: Arc<TokenRegistry>,
    descriptors: Vec<ServiceDescriptor>,
    singletons: RwLock<HashMap<Token, Instance>>,
    options: ContainerOptions,
}

/// Root resolution engine
///
/// Owns the frozen registration list and the singleton cache. Cloning the
/// provider hands out another handle on the same state; every scope keeps
/// such a handle.
#[derive(Clone)]
pub struct ServiceProvider {
    state: Arc<ProviderState>,
}

impl ServiceProvider {
    pub(crate) fn new(
        registry: Arc<TokenRegistry>,
        descriptors: Vec<ServiceDescriptor>,
        options: ContainerOptions,
    ) -> Self {
        tracing::debug!(
            descriptors = descriptors.len(),
            validate_scopes = options.validate_scopes,
            "building service provider"
        );

        Self {
            state: Arc::new(ProviderState {
                registry,
                descriptors,
                singletons: RwLock::new(HashMap::new()),
                options,
            }),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.state.options
    }

    pub fn token_registry(&self) -> &Arc<TokenRegistry> {
        &self.state.registry
    }

    /// Number of registrations, overridden ones included
    pub fn descriptor_count(&self) -> usize {
        self.state.descriptors.len()
    }

    /// Number of singletons created so far
    pub fn singleton_count(&self) -> usize {
        self.state
            .singletons
            .read()
            .map(|singletons| singletons.len())
            .unwrap_or(0)
    }

    /// The registration that wins for an identifier: the last one added
    pub(crate) fn find_descriptor(&self, service_id: &ServiceId) -> Option<&ServiceDescriptor> {
        let token = self.state.registry.lookup(service_id)?;
        self.state
            .descriptors
            .iter()
            .rev()
            .find(|descriptor| descriptor.token() == token)
    }

    pub(crate) fn cached_singleton(&self, token: Token) -> Result<Option<Instance>, CoreError> {
        let singletons = self
            .state
            .singletons
            .read()
            .map_err(|_| CoreError::lock_error("singleton_instances"))?;
        Ok(singletons.get(&token).cloned())
    }

    pub(crate) fn store_singleton(
        &self,
        token: Token,
        instance: Instance,
    ) -> Result<Instance, CoreError> {
        let mut singletons = self
            .state
            .singletons
            .write()
            .map_err(|_| CoreError::lock_error("singleton_instances"))?;
        Ok(singletons.entry(token).or_insert(instance).clone())
    }

    /// Check whether two handles point at the same provider
    pub fn ptr_eq(&self, other: &ServiceProvider) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Resolve for ServiceProvider {
    fn resolver(&self) -> Resolver<'_> {
        Resolver::root(self)
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("descriptor_count", &self.descriptor_count())
            .field("singleton_count", &self.singleton_count())
            .field("options", &self.state.options)
            .finish()
    }
}
