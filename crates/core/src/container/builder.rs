use std::sync::Arc;

use crate::config::{ConfigTrait, ContainerOptions};
use crate::container::descriptor::{
    erase, Implementation, ImplementationSource, ServiceDescriptor, ServiceId, ServiceKey,
};
use crate::container::lifetime::ServiceLifetime;
use crate::container::provider::ServiceProvider;
use crate::container::resolver::Resolver;
use crate::container::tokens::{ServiceToken, TokenRegistry};
use crate::errors::CoreError;

/// Registration collection
///
/// Descriptors are appended in order and never removed. Registering an
/// identifier again is an override: resolution always honours the most
/// recent registration.
///
/// ```rust
/// use std::sync::Arc;
/// use taskpilot_core::container::{Resolve, ServiceCollection};
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) {
///         println!("{message}");
///     }
/// }
///
/// struct Widget {
///     logger: Arc<dyn Logger>,
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton_factory(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
///     .add_transient_factory(|resolver| {
///         Ok(Arc::new(Widget {
///             logger: resolver.get_required_service::<dyn Logger>()?,
///         }))
///     });
///
/// let provider = services.build();
/// let first = provider.get_required_service::<Widget>().unwrap();
/// let second = provider.get_required_service::<Widget>().unwrap();
/// assert!(Arc::ptr_eq(&first.logger, &second.logger));
/// assert!(!Arc::ptr_eq(&first, &second));
/// ```
pub struct ServiceCollection {
    registry: Arc<TokenRegistry>,
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    /// Create a collection with its own identifier registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TokenRegistry::new()))
    }

    /// Create a collection allocating tokens from a shared registry
    pub fn with_registry(registry: Arc<TokenRegistry>) -> Self {
        Self {
            registry,
            descriptors: Vec::new(),
        }
    }

    pub fn token_registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    /// Append a raw registration
    pub(crate) fn add_descriptor(
        &mut self,
        service_id: ServiceId,
        lifetime: ServiceLifetime,
        source: ImplementationSource,
    ) -> &mut Self {
        let token = self.registry.token_for(&service_id);

        if self.descriptors.iter().any(|descriptor| descriptor.token() == token) {
            tracing::debug!(service = %service_id, %lifetime, "overriding earlier registration");
        } else {
            tracing::debug!(service = %service_id, %lifetime, "registering service");
        }

        self.descriptors
            .push(ServiceDescriptor::new(token, service_id, lifetime, source));
        self
    }

    /// Register a key with a typed implementation
    pub fn add_keyed<T>(
        &mut self,
        key: ServiceKey<T>,
        lifetime: ServiceLifetime,
        implementation: Implementation<T>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_descriptor(key.id().clone(), lifetime, implementation.into_source())
    }

    /// Register a type with a typed implementation
    pub fn add_with<T>(
        &mut self,
        lifetime: ServiceLifetime,
        implementation: Implementation<T>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_keyed(ServiceKey::of(), lifetime, implementation)
    }

    /// Register a self-constructing transient service
    pub fn add_transient<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.add_with(ServiceLifetime::Transient, Implementation::<T>::self_constructed())
    }

    /// Register a self-constructing singleton service
    pub fn add_singleton<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.add_with(ServiceLifetime::Singleton, Implementation::<T>::self_constructed())
    }

    /// Register a self-constructing scoped service
    pub fn add_scoped<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.add_with(ServiceLifetime::Scoped, Implementation::<T>::self_constructed())
    }

    /// Register a transient service with a typed implementation
    pub fn add_transient_with<T>(&mut self, implementation: Implementation<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_with(ServiceLifetime::Transient, implementation)
    }

    /// Register a singleton service with a typed implementation
    pub fn add_singleton_with<T>(&mut self, implementation: Implementation<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_with(ServiceLifetime::Singleton, implementation)
    }

    /// Register a scoped service with a typed implementation
    pub fn add_scoped_with<T>(&mut self, implementation: Implementation<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_with(ServiceLifetime::Scoped, implementation)
    }

    /// Register a transient service built by a factory
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        self.add_transient_with(Implementation::factory(factory))
    }

    /// Register a singleton service built by a factory
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        self.add_singleton_with(Implementation::factory(factory))
    }

    /// Register a scoped service built by a factory
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        self.add_scoped_with(Implementation::factory(factory))
    }

    /// Register a pre-built instance; instances are always singletons
    pub fn add_singleton_instance<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_descriptor(
            ServiceId::of::<T>(),
            ServiceLifetime::Singleton,
            ImplementationSource::Instance(erase(instance)),
        )
    }

    /// Register a named implementation of a type
    pub fn add_named<T>(
        &mut self,
        name: impl Into<String>,
        lifetime: ServiceLifetime,
        implementation: Implementation<T>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_keyed(ServiceKey::named(name), lifetime, implementation)
    }

    /// Register a pre-built singleton instance under a name
    pub fn add_named_instance<T>(
        &mut self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_descriptor(
            ServiceId::named::<T>(name),
            ServiceLifetime::Singleton,
            ImplementationSource::Instance(erase(instance)),
        )
    }

    /// Register an implementation under a marker token
    pub fn add_by_token<K: ServiceToken>(
        &mut self,
        lifetime: ServiceLifetime,
        implementation: Implementation<K::Service>,
    ) -> &mut Self {
        self.add_keyed(ServiceKey::token::<K>(), lifetime, implementation)
    }

    /// Register a pre-built singleton instance under a marker token
    pub fn add_instance_by_token<K: ServiceToken>(
        &mut self,
        instance: Arc<K::Service>,
    ) -> &mut Self {
        self.add_descriptor(
            ServiceId::token::<K>(),
            ServiceLifetime::Singleton,
            ImplementationSource::Instance(erase(instance)),
        )
    }

    /// Register a marker token without an implementation
    ///
    /// Marker types cannot construct their service, so resolving such a
    /// registration fails with [`CoreError::AmbiguousImplementation`] unless a
    /// later registration overrides it.
    pub fn add_token<K: ServiceToken>(&mut self, lifetime: ServiceLifetime) -> &mut Self {
        self.add_descriptor(
            ServiceId::token::<K>(),
            lifetime,
            ImplementationSource::Unspecified,
        )
    }

    /// Register only if the type has no registration yet
    pub fn try_add_with<T>(
        &mut self,
        lifetime: ServiceLifetime,
        implementation: Implementation<T>,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.contains::<T>() {
            tracing::trace!(service = %ServiceId::of::<T>(), "already registered, skipping");
            return self;
        }
        self.add_with(lifetime, implementation)
    }

    pub fn try_add_transient<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.try_add_with(ServiceLifetime::Transient, Implementation::<T>::self_constructed())
    }

    pub fn try_add_singleton<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.try_add_with(ServiceLifetime::Singleton, Implementation::<T>::self_constructed())
    }

    pub fn try_add_scoped<T: Default + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.try_add_with(ServiceLifetime::Scoped, Implementation::<T>::self_constructed())
    }

    /// Check if a type has at least one registration
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_id(&ServiceId::of::<T>())
    }

    pub fn contains_id(&self, service_id: &ServiceId) -> bool {
        self.descriptors
            .iter()
            .any(|descriptor| descriptor.service_id() == service_id)
    }

    /// Number of registrations, overridden ones included
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registrations in the order they were added
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    /// Freeze the collection into a provider with default options
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.registry, self.descriptors, ContainerOptions::default())
    }

    /// Freeze the collection into a provider, validating according to `options`
    pub fn build_with_options(
        self,
        options: ContainerOptions,
    ) -> Result<ServiceProvider, CoreError> {
        options.validate()?;

        if options.validate_on_build {
            self.validate()?;
        }

        Ok(ServiceProvider::new(self.registry, self.descriptors, options))
    }

    /// Check that every winning registration can produce an instance
    pub fn validate(&self) -> Result<(), CoreError> {
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            let overridden = self.descriptors[index + 1..]
                .iter()
                .any(|later| later.token() == descriptor.token());

            if overridden {
                continue;
            }

            if !descriptor.source().is_specified() {
                return Err(CoreError::ambiguous_implementation(
                    descriptor.service_id().to_string(),
                ));
            }
            descriptor.ensure_lifetime_fits_source()?;
        }

        Ok(())
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Resolve;

    trait Storage: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    impl std::fmt::Debug for dyn Storage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.kind())
        }
    }

    #[derive(Default)]
    struct MemoryStorage;

    impl Storage for MemoryStorage {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    struct StorageToken;
    impl ServiceToken for StorageToken {
        type Service = dyn Storage;
    }

    #[derive(Debug, Default)]
    struct Clock;

    #[test]
    fn test_fluent_registration_appends_descriptors() {
        let mut services = ServiceCollection::new();
        services
            .add_transient::<Clock>()
            .add_singleton_factory(|_| Ok(Arc::new(MemoryStorage) as Arc<dyn Storage>))
            .add_token::<StorageToken>(ServiceLifetime::Scoped);

        assert_eq!(services.len(), 3);
        assert!(services.contains::<Clock>());
        assert!(services.contains::<dyn Storage>());
        assert!(services.contains_id(&ServiceId::token::<StorageToken>()));

        let lifetimes: Vec<_> = services.descriptors().map(|d| d.lifetime()).collect();
        assert_eq!(
            lifetimes,
            vec![
                ServiceLifetime::Transient,
                ServiceLifetime::Singleton,
                ServiceLifetime::Scoped
            ]
        );
    }

    #[test]
    fn test_duplicate_registration_shares_token() {
        let mut services = ServiceCollection::new();
        services.add_transient::<Clock>().add_singleton::<Clock>();

        let tokens: Vec<_> = services.descriptors().map(|d| d.token()).collect();
        assert_eq!(tokens[0], tokens[1]);
        assert_eq!(services.token_registry().len(), 1);
    }

    #[test]
    fn test_try_add_keeps_first_registration() {
        let mut services = ServiceCollection::new();
        services.try_add_singleton::<Clock>().try_add_transient::<Clock>();

        assert_eq!(services.len(), 1);
        assert_eq!(
            services.descriptors().next().map(|d| d.lifetime()),
            Some(ServiceLifetime::Singleton)
        );
    }

    #[test]
    fn test_validate_reports_unspecified_source() {
        let mut services = ServiceCollection::new();
        services.add_token::<StorageToken>(ServiceLifetime::Singleton);

        let error = services.validate().unwrap_err();
        assert!(error.is_ambiguous_implementation());

        let error = services
            .build_with_options(ContainerOptions::new().with_validate_on_build(true))
            .unwrap_err();
        assert!(error.is_ambiguous_implementation());
    }

    #[test]
    fn test_validate_ignores_overridden_unspecified_source() {
        let mut services = ServiceCollection::new();
        services
            .add_token::<StorageToken>(ServiceLifetime::Singleton)
            .add_by_token::<StorageToken>(
                ServiceLifetime::Singleton,
                Implementation::constructor(|| Arc::new(MemoryStorage) as Arc<dyn Storage>),
            );

        assert!(services.validate().is_ok());
        let provider = services
            .build_with_options(ContainerOptions::strict())
            .unwrap();
        let storage = provider.get_required_service_by_token::<StorageToken>().unwrap();
        assert_eq!(storage.kind(), "memory");
    }

    #[test]
    fn test_prebuilt_instance_requires_singleton_lifetime() {
        let mut services = ServiceCollection::new();
        services.add_descriptor(
            ServiceId::of::<Clock>(),
            ServiceLifetime::Transient,
            ImplementationSource::Instance(erase(Arc::new(Clock))),
        );

        let error = services.validate().unwrap_err();
        assert!(error.is_invalid_lifetime());

        let error = services
            .build_with_options(ContainerOptions::strict())
            .unwrap_err();
        assert!(error.is_invalid_lifetime());
    }

    #[test]
    fn test_prebuilt_instance_with_wrong_lifetime_fails_at_resolution() {
        let mut services = ServiceCollection::new();
        services.add_descriptor(
            ServiceId::of::<Clock>(),
            ServiceLifetime::Transient,
            ImplementationSource::Instance(erase(Arc::new(Clock))),
        );
        let provider = services.build();

        let error = provider.get_required_service::<Clock>().unwrap_err();
        assert!(error.is_invalid_lifetime());
        assert!(provider.get_service::<Clock>().is_none());

        let scope = provider.create_scope();
        assert!(scope.get_required_service::<Clock>().unwrap_err().is_invalid_lifetime());
    }

    #[test]
    fn test_overridden_instance_registration_is_not_checked() {
        let mut services = ServiceCollection::new();
        services
            .add_descriptor(
                ServiceId::of::<Clock>(),
                ServiceLifetime::Scoped,
                ImplementationSource::Instance(erase(Arc::new(Clock))),
            )
            .add_transient::<Clock>();

        assert!(services.validate().is_ok());
        let provider = services
            .build_with_options(ContainerOptions::strict())
            .unwrap();
        let first = provider.get_required_service::<Clock>().unwrap();
        let second = provider.get_required_service::<Clock>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lazy_validation_by_default() {
        let mut services = ServiceCollection::new();
        services.add_token::<StorageToken>(ServiceLifetime::Transient);

        let provider = services.build();
        let error = provider
            .get_required_service_by_token::<StorageToken>()
            .unwrap_err();
        assert!(error.is_ambiguous_implementation());
        assert!(provider.get_service_by_token::<StorageToken>().is_none());
    }

    #[test]
    fn test_build_rejects_invalid_options() {
        let error = ServiceCollection::new()
            .build_with_options(ContainerOptions::new().with_max_resolution_depth(0))
            .unwrap_err();
        assert!(matches!(error, CoreError::Configuration(_)));
    }
}
