use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::lifetime::ServiceLifetime;
use crate::container::resolver::Resolver;
use crate::container::tokens::{ServiceToken, Token};
use crate::errors::CoreError;

/// Service identifier combining type and optional name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub name: Option<String>,
}

impl ServiceId {
    /// Create a new service ID for a type or trait object
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    /// Create a named service ID for a type
    pub fn named<T: 'static + ?Sized>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: Some(name.into()),
        }
    }

    /// Create a service ID keyed by a marker token type
    pub fn token<K: ServiceToken>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            type_name: K::token_type_name(),
            name: None,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})", self.type_name, name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// Typed handle on a service identifier
///
/// Pairs a [`ServiceId`] with the type that resolution hands back, so that a
/// string key or a marker token still resolves to a concrete `Arc<T>`.
pub struct ServiceKey<T: ?Sized> {
    id: ServiceId,
    _service: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ServiceKey<T> {
    /// Key for the type itself
    pub fn of() -> Self {
        Self::from_id(ServiceId::of::<T>())
    }

    /// Key for a named registration of the type
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_id(ServiceId::named::<T>(name))
    }

    /// Key for a marker token resolving to the token's service type
    pub fn token<K: ServiceToken<Service = T>>() -> Self {
        Self::from_id(ServiceId::token::<K>())
    }

    fn from_id(id: ServiceId) -> Self {
        Self {
            id,
            _service: PhantomData,
        }
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }
}

impl<T: ?Sized> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _service: PhantomData,
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.id).finish()
    }
}

/// Type-erased service instance
///
/// Holds an `Arc<T>` behind `Any` so that unsized services such as
/// `dyn Trait` can be stored alongside concrete ones.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Instance {
    Arc::new(service)
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
    service_id: &ServiceId,
) -> Result<Arc<T>, CoreError> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| CoreError::ServiceTypeMismatch {
            service: service_id.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// No-argument constructor producing an erased instance
pub type ServiceConstructor = Box<dyn Fn() -> Instance + Send + Sync>;

/// Factory receiving the active resolver
pub type ServiceFactory =
    Box<dyn Fn(&Resolver<'_>) -> Result<Instance, CoreError> + Send + Sync>;

/// How a descriptor produces its instance
pub enum ImplementationSource {
    /// Constructed with no arguments
    Constructor(ServiceConstructor),
    /// Built by a factory that may resolve its own dependencies
    Factory(ServiceFactory),
    /// Pre-built instance, only created for singleton registrations
    Instance(Instance),
    /// Nothing to construct the identifier from; fails on resolution
    Unspecified,
}

impl ImplementationSource {
    pub fn is_specified(&self) -> bool {
        !matches!(self, ImplementationSource::Unspecified)
    }
}

impl std::fmt::Debug for ImplementationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImplementationSource::Constructor(_) => write!(f, "Constructor(<constructor_fn>)"),
            ImplementationSource::Factory(_) => write!(f, "Factory(<factory_fn>)"),
            ImplementationSource::Instance(_) => write!(f, "Instance(<instance>)"),
            ImplementationSource::Unspecified => write!(f, "Unspecified"),
        }
    }
}

/// Typed implementation source accepted by the registration API
pub enum Implementation<T: ?Sized> {
    Constructor(Box<dyn Fn() -> Arc<T> + Send + Sync>),
    Factory(Box<dyn Fn(&Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync>),
}

impl<T: ?Sized + Send + Sync + 'static> Implementation<T> {
    /// Use a no-argument constructor
    pub fn constructor<F>(constructor: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Implementation::Constructor(Box::new(constructor))
    }

    /// Use a factory that receives the active resolver
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        Implementation::Factory(Box::new(factory))
    }

    pub(crate) fn into_source(self) -> ImplementationSource {
        match self {
            Implementation::Constructor(constructor) => {
                ImplementationSource::Constructor(Box::new(move || erase(constructor())))
            }
            Implementation::Factory(factory) => ImplementationSource::Factory(Box::new(
                move |resolver: &Resolver<'_>| factory(resolver).map(erase),
            )),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Implementation<T> {
    /// Construct the identifier itself through `Default`
    pub fn self_constructed() -> Self {
        Implementation::constructor(|| Arc::new(T::default()))
    }
}

impl<T: ?Sized> std::fmt::Debug for Implementation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Implementation::Constructor(_) => write!(f, "Constructor(<constructor_fn>)"),
            Implementation::Factory(_) => write!(f, "Factory(<factory_fn>)"),
        }
    }
}

/// One registration record
pub struct ServiceDescriptor {
    token: Token,
    service_id: ServiceId,
    lifetime: ServiceLifetime,
    source: ImplementationSource,
}

impl ServiceDescriptor {
    pub(crate) fn new(
        token: Token,
        service_id: ServiceId,
        lifetime: ServiceLifetime,
        source: ImplementationSource,
    ) -> Self {
        Self {
            token,
            service_id,
            lifetime,
            source,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn source(&self) -> &ImplementationSource {
        &self.source
    }

    /// Pre-built instances are shared, so only singleton registrations may hold one
    pub(crate) fn ensure_lifetime_fits_source(&self) -> Result<(), CoreError> {
        match (&self.source, self.lifetime) {
            (ImplementationSource::Instance(_), ServiceLifetime::Singleton) => Ok(()),
            (ImplementationSource::Instance(_), lifetime) => Err(
                CoreError::instance_requires_singleton(&self.service_id, lifetime),
            ),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("token", &self.token)
            .field("service_id", &self.service_id)
            .field("lifetime", &self.lifetime)
            .field("source", &self.source)
            .finish()
    }
}
