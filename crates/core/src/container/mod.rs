pub mod builder;
#[allow(clippy::module_inception)]
pub mod container;
pub mod descriptor;
pub mod lifetime;
pub mod provider;
pub mod resolver;
pub mod scope;
pub mod tokens;

pub use builder::ServiceCollection;
pub use container::Container;
pub use descriptor::{
    Implementation, ImplementationSource, Instance, ServiceConstructor, ServiceDescriptor,
    ServiceFactory, ServiceId, ServiceKey,
};
pub use lifetime::ServiceLifetime;
pub use provider::ServiceProvider;
pub use resolver::{Resolve, Resolver};
pub use scope::{ScopeId, ServiceScope};
pub use tokens::{ServiceToken, Token, TokenRegistry};
