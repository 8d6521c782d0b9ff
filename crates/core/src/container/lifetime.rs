/// Instance reuse policy of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// New instance created for each resolution
    Transient,
    /// Single instance shared across the provider and all of its scopes
    Singleton,
    /// One instance per scope
    Scoped,
}

impl ServiceLifetime {
    /// Check if the lifetime is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, ServiceLifetime::Singleton)
    }

    /// Check if the lifetime is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceLifetime::Transient)
    }

    /// Check if the lifetime is scoped
    pub fn is_scoped(&self) -> bool {
        matches!(self, ServiceLifetime::Scoped)
    }

    /// Get the lifetime name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLifetime::Transient => "transient",
            ServiceLifetime::Singleton => "singleton",
            ServiceLifetime::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceLifetime {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transient" => Ok(ServiceLifetime::Transient),
            "singleton" => Ok(ServiceLifetime::Singleton),
            "scoped" => Ok(ServiceLifetime::Scoped),
            _ => Err(crate::errors::CoreError::InvalidLifetime {
                lifetime: s.to_string(),
            }),
        }
    }
}
