//! Resolution algorithm shared by the provider and its scopes
//!
//! A [`Resolver`] is the active resolution context: it knows whether it runs
//! against the root provider or against a scope, and it carries the chain of
//! descriptors currently being constructed. Factories receive the resolver so
//! they can pull in their own dependencies; that callback is the only
//! injection mechanism.

use std::sync::Arc;

use crate::container::descriptor::{
    downcast, ImplementationSource, Instance, ServiceDescriptor, ServiceId, ServiceKey,
};
use crate::container::lifetime::ServiceLifetime;
use crate::container::provider::ServiceProvider;
use crate::container::scope::{ScopeId, ServiceScope};
use crate::container::tokens::ServiceToken;
use crate::errors::CoreError;

#[derive(Clone, Copy)]
enum Target<'a> {
    Root(&'a ServiceProvider),
    Scope(&'a ServiceScope),
}

/// Active resolution context handed to factories
#[derive(Clone)]
pub struct Resolver<'a> {
    target: Target<'a>,
    path: Vec<&'a ServiceDescriptor>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn root(provider: &'a ServiceProvider) -> Self {
        Self {
            target: Target::Root(provider),
            path: Vec::new(),
        }
    }

    pub(crate) fn scoped(scope: &'a ServiceScope) -> Self {
        Self {
            target: Target::Scope(scope),
            path: Vec::new(),
        }
    }

    /// The provider this resolution runs against
    pub fn provider(&self) -> &'a ServiceProvider {
        match self.target {
            Target::Root(provider) => provider,
            Target::Scope(scope) => scope.provider(),
        }
    }

    /// The scope this resolution runs in, if any
    pub fn scope_id(&self) -> Option<ScopeId> {
        match self.target {
            Target::Root(_) => None,
            Target::Scope(scope) => Some(scope.id()),
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self.target, Target::Scope(_))
    }

    /// Number of factories currently on the construction chain
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn resolve_instance(
        &self,
        service_id: &ServiceId,
    ) -> Result<Option<Instance>, CoreError> {
        if let Target::Scope(scope) = self.target {
            scope.ensure_active()?;
        }

        let provider = self.provider();
        let Some(descriptor) = provider.find_descriptor(service_id) else {
            tracing::trace!(service = %service_id, "no registration found");
            return Ok(None);
        };

        if self.path.iter().any(|entry| entry.token() == descriptor.token()) {
            return Err(self.circular_dependency(descriptor));
        }

        let instance = match descriptor.lifetime() {
            ServiceLifetime::Singleton => self.resolve_singleton(provider, descriptor)?,
            ServiceLifetime::Scoped => match self.target {
                Target::Scope(scope) => self.resolve_scoped(scope, descriptor)?,
                Target::Root(_) if provider.options().validate_scopes => {
                    return Err(CoreError::ScopedFromRoot {
                        service: service_id.to_string(),
                    });
                }
                Target::Root(_) => {
                    tracing::debug!(
                        service = %service_id,
                        "scoped service resolved from root provider, treating as transient"
                    );
                    self.instantiate(descriptor, self.target)?
                }
            },
            ServiceLifetime::Transient => self.instantiate(descriptor, self.target)?,
        };

        Ok(Some(instance))
    }

    fn resolve_singleton(
        &self,
        provider: &'a ServiceProvider,
        descriptor: &'a ServiceDescriptor,
    ) -> Result<Instance, CoreError> {
        if let Some(instance) = provider.cached_singleton(descriptor.token())? {
            tracing::trace!(service = %descriptor.service_id(), "singleton cache hit");
            return Ok(instance);
        }

        // Singletons are built against the root so they never capture
        // an instance owned by the scope that happened to ask first.
        let instance = self.instantiate(descriptor, Target::Root(provider))?;
        provider.store_singleton(descriptor.token(), instance)
    }

    fn resolve_scoped(
        &self,
        scope: &'a ServiceScope,
        descriptor: &'a ServiceDescriptor,
    ) -> Result<Instance, CoreError> {
        if let Some(instance) = scope.cached(descriptor.token())? {
            tracing::trace!(
                service = %descriptor.service_id(),
                scope_id = %scope.id(),
                "scoped cache hit"
            );
            return Ok(instance);
        }

        let instance = self.instantiate(descriptor, Target::Scope(scope))?;
        scope.store(descriptor.token(), instance)
    }

    fn instantiate(
        &self,
        descriptor: &'a ServiceDescriptor,
        target: Target<'a>,
    ) -> Result<Instance, CoreError> {
        tracing::debug!(
            service = %descriptor.service_id(),
            lifetime = %descriptor.lifetime(),
            "creating service instance"
        );

        match descriptor.source() {
            ImplementationSource::Instance(instance) => {
                descriptor.ensure_lifetime_fits_source()?;
                Ok(instance.clone())
            }
            ImplementationSource::Constructor(constructor) => Ok(constructor()),
            ImplementationSource::Factory(factory) => {
                let max_depth = self.provider().options().max_resolution_depth;
                if self.path.len() >= max_depth {
                    return Err(CoreError::ResolutionDepthExceeded {
                        service: descriptor.service_id().to_string(),
                        max_depth,
                    });
                }

                let mut path = self.path.clone();
                path.push(descriptor);
                factory(&Resolver { target, path })
            }
            ImplementationSource::Unspecified => Err(CoreError::ambiguous_implementation(
                descriptor.service_id().to_string(),
            )),
        }
    }

    fn circular_dependency(&self, descriptor: &ServiceDescriptor) -> CoreError {
        let path = self
            .path
            .iter()
            .map(|entry| entry.service_id().to_string())
            .chain(std::iter::once(descriptor.service_id().to_string()))
            .collect::<Vec<_>>()
            .join(" -> ");

        CoreError::CircularDependency {
            path,
            cycle_service: descriptor.service_id().to_string(),
        }
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("scope_id", &self.scope_id())
            .field("depth", &self.depth())
            .finish()
    }
}

/// Resolution surface shared by [`ServiceProvider`], [`ServiceScope`] and
/// the [`Resolver`] passed to factories
pub trait Resolve {
    /// The resolution context requests run against
    fn resolver(&self) -> Resolver<'_>;

    /// Resolve a key, reporting factory and configuration failures
    ///
    /// Returns `Ok(None)` when nothing is registered for the key.
    fn try_get_by_key<T>(&self, key: &ServiceKey<T>) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.resolver().resolve_instance(key.id())? {
            Some(instance) => downcast::<T>(&instance, key.id()).map(Some),
            None => Ok(None),
        }
    }

    /// Best-effort resolution of a key; never fails
    fn get_by_key<T>(&self, key: &ServiceKey<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.try_get_by_key(key) {
            Ok(service) => service,
            Err(error) => {
                tracing::warn!(service = %key.id(), %error, "service resolution failed");
                None
            }
        }
    }

    /// Resolve a key, failing when it is not registered
    fn get_required_by_key<T>(&self, key: &ServiceKey<T>) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_get_by_key(key)?
            .ok_or_else(|| CoreError::service_not_registered(key.id().to_string()))
    }

    /// Resolve a type, returning `None` when it is missing or fails to build
    fn get_service<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_by_key(&ServiceKey::<T>::of())
    }

    /// Resolve a type, failing when it is not registered
    fn get_required_service<T>(&self) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_required_by_key(&ServiceKey::<T>::of())
    }

    /// Resolve a type, reporting failures but not absence
    fn try_get_service<T>(&self) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_get_by_key(&ServiceKey::<T>::of())
    }

    /// Resolve a named registration of a type
    fn get_named_service<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_by_key(&ServiceKey::<T>::named(name))
    }

    /// Resolve a named registration, failing when it is not registered
    fn get_required_named_service<T>(&self, name: &str) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_required_by_key(&ServiceKey::<T>::named(name))
    }

    /// Resolve the service behind a marker token
    fn get_service_by_token<K: ServiceToken>(&self) -> Option<Arc<K::Service>> {
        self.get_by_key(&ServiceKey::token::<K>())
    }

    /// Resolve the service behind a marker token, failing when it is not registered
    fn get_required_service_by_token<K: ServiceToken>(
        &self,
    ) -> Result<Arc<K::Service>, CoreError> {
        self.get_required_by_key(&ServiceKey::token::<K>())
    }

    /// Check whether any registration exists for the type
    fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.resolver()
            .provider()
            .find_descriptor(&ServiceId::of::<T>())
            .is_some()
    }

    /// Create a new scope bound to the same provider
    fn create_scope(&self) -> ServiceScope {
        ServiceScope::new(self.resolver().provider().clone())
    }
}

impl Resolve for Resolver<'_> {
    fn resolver(&self) -> Resolver<'_> {
        self.clone()
    }
}
