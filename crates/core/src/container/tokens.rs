//! Identifier registry
//!
//! Every service identifier is mapped to an opaque [`Token`] the first time it
//! is registered. Descriptors and instance caches are keyed by token, so the
//! typed registration and resolution API never leaks into storage.
//!
//! Identifiers do not need to know about the container. A plain type, a
//! `dyn Trait` contract, a string key attached to a type, or a marker type
//! implementing [`ServiceToken`] all work.
//!
//! ```rust
//! use taskpilot_core::container::{ServiceId, ServiceToken, TokenRegistry};
//!
//! trait Clock: Send + Sync {}
//!
//! struct SystemClockToken;
//! impl ServiceToken for SystemClockToken {
//!     type Service = dyn Clock;
//! }
//!
//! let registry = TokenRegistry::new();
//! let first = registry.token_for(&ServiceId::token::<SystemClockToken>());
//! let again = registry.token_for(&ServiceId::token::<SystemClockToken>());
//! assert_eq!(first, again);
//! ```

use crate::container::descriptor::ServiceId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Marker type standing in for an abstract service contract
///
/// Tokens are zero-sized types used as identifiers when the service itself is
/// a trait object, or when several registrations share one service type.
pub trait ServiceToken: Send + Sync + 'static {
    /// The service type this token resolves to
    type Service: ?Sized + Send + Sync + 'static;

    /// Get the token type name, used in error messages
    fn token_type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Get the service type name, used in error messages
    fn service_type_name() -> &'static str {
        std::any::type_name::<Self::Service>()
    }
}

/// Opaque, uniquely generated key for one service identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(Uuid);

impl Token {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "svc-{}", self.0.simple())
    }
}

/// Registry mapping service identifiers to tokens
///
/// The same identifier always yields the same token until [`reset`] is
/// called; distinct identifiers never share a token.
///
/// [`reset`]: TokenRegistry::reset
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<ServiceId, Token>>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the token for an identifier, allocating one on first sight
    pub fn token_for(&self, service_id: &ServiceId) -> Token {
        if let Some(token) = self.lookup(service_id) {
            return token;
        }

        // The map is only ever inserted into or cleared, so a poisoned lock
        // still holds consistent data.
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *tokens.entry(service_id.clone()).or_insert_with(|| {
            let token = Token::generate();
            tracing::trace!(service = %service_id, %token, "allocated service token");
            token
        })
    }

    /// Return the token for an identifier without allocating
    pub fn lookup(&self, service_id: &ServiceId) -> Option<Token> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_id)
            .copied()
    }

    /// Forget every identifier to token association
    pub fn reset(&self) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(cleared = tokens.len(), "resetting token registry");
        tokens.clear();
    }

    /// Number of identifiers seen since the last reset
    pub fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Notifier: Send + Sync {}

    struct EmailToken;
    impl ServiceToken for EmailToken {
        type Service = dyn Notifier;
    }

    struct SmsToken;
    impl ServiceToken for SmsToken {
        type Service = dyn Notifier;
    }

    #[test]
    fn test_same_identifier_same_token() {
        let registry = TokenRegistry::new();

        let first = registry.token_for(&ServiceId::of::<String>());
        let second = registry.token_for(&ServiceId::of::<String>());

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_identifiers_never_collide() {
        let registry = TokenRegistry::new();

        let tokens = [
            registry.token_for(&ServiceId::of::<String>()),
            registry.token_for(&ServiceId::of::<dyn Notifier>()),
            registry.token_for(&ServiceId::named::<String>("greeting")),
            registry.token_for(&ServiceId::token::<EmailToken>()),
            registry.token_for(&ServiceId::token::<SmsToken>()),
        ];

        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_lookup_does_not_allocate() {
        let registry = TokenRegistry::new();

        assert_eq!(registry.lookup(&ServiceId::of::<u32>()), None);
        assert!(registry.is_empty());

        let token = registry.token_for(&ServiceId::of::<u32>());
        assert_eq!(registry.lookup(&ServiceId::of::<u32>()), Some(token));
    }

    #[test]
    fn test_reset_forgets_tokens() {
        let registry = TokenRegistry::new();
        let before = registry.token_for(&ServiceId::of::<String>());

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(&ServiceId::of::<String>()), None);

        let after = registry.token_for(&ServiceId::of::<String>());
        assert_ne!(before, after);
    }

    #[test]
    fn test_token_type_names() {
        assert!(EmailToken::token_type_name().ends_with("EmailToken"));
        assert!(EmailToken::service_type_name().contains("Notifier"));
        assert!(Token::generate().to_string().starts_with("svc-"));
    }
}
