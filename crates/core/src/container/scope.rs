use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::container::descriptor::Instance;
use crate::container::provider::ServiceProvider;
use crate::container::resolver::{Resolve, Resolver};
use crate::container::tokens::Token;
use crate::errors::CoreError;

/// Unique identifier of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(uuid::Uuid);

impl ScopeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Child resolution context around a logical unit of work
///
/// Scoped registrations get one instance per scope. Singletons and
/// transients behave exactly as they do on the provider the scope came from.
pub struct ServiceScope {
    id: ScopeId,
    provider: ServiceProvider,
    instances: RwLock<HashMap<Token, Instance>>,
    disposed: AtomicBool,
}

impl ServiceScope {
    pub(crate) fn new(provider: ServiceProvider) -> Self {
        let id = ScopeId::new();
        tracing::debug!(scope_id = %id, "scope created");

        Self {
            id,
            provider,
            instances: RwLock::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Get the scope ID
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Number of scoped instances currently cached
    pub fn scoped_count(&self) -> usize {
        self.instances
            .read()
            .map(|instances| instances.len())
            .unwrap_or(0)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Forget every scoped instance held by this scope
    ///
    /// Only this scope's cache is touched. Instances are released, no hook
    /// is run on them. Resolving through the scope afterwards fails with
    /// [`CoreError::ScopeDisposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(scope_id = %self.id, released = instances.len(), "scope disposed");
        instances.clear();
    }

    pub(crate) fn ensure_active(&self) -> Result<(), CoreError> {
        if self.is_disposed() {
            return Err(CoreError::ScopeDisposed {
                scope_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn cached(&self, token: Token) -> Result<Option<Instance>, CoreError> {
        let instances = self
            .instances
            .read()
            .map_err(|_| CoreError::lock_error("scoped_instances"))?;
        Ok(instances.get(&token).cloned())
    }

    pub(crate) fn store(&self, token: Token, instance: Instance) -> Result<Instance, CoreError> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| CoreError::lock_error("scoped_instances"))?;
        Ok(instances.entry(token).or_insert(instance).clone())
    }
}

impl Resolve for ServiceScope {
    fn resolver(&self) -> Resolver<'_> {
        Resolver::scoped(self)
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.id)
            .field("scoped_count", &self.scoped_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
