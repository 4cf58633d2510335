//! Driver registry: the factory from provider tag to driver

use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::{
    DatabaseDriver, DocumentDriver, DocumentTimeouts, DriverFamily, ProviderKind, Result,
    TesseraError,
};

/// A resolved driver, split by contract
#[derive(Clone)]
pub enum DriverHandle {
    Relational(Arc<dyn DatabaseDriver>),
    Document(Arc<dyn DocumentDriver>),
}

impl DriverHandle {
    pub fn provider(&self) -> ProviderKind {
        match self {
            DriverHandle::Relational(driver) => driver.provider(),
            DriverHandle::Document(driver) => driver.provider(),
        }
    }

    pub fn family(&self) -> DriverFamily {
        match self {
            DriverHandle::Relational(_) => DriverFamily::Relational,
            DriverHandle::Document(_) => DriverFamily::Document,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DriverHandle::Relational(driver) => driver.display_name(),
            DriverHandle::Document(driver) => driver.display_name(),
        }
    }

    pub fn as_relational(&self) -> Option<&Arc<dyn DatabaseDriver>> {
        match self {
            DriverHandle::Relational(driver) => Some(driver),
            DriverHandle::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&Arc<dyn DocumentDriver>> {
        match self {
            DriverHandle::Document(driver) => Some(driver),
            DriverHandle::Relational(_) => None,
        }
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(match self {
            DriverHandle::Relational(_) => "Relational",
            DriverHandle::Document(_) => "Document",
        })
        .field(&self.provider())
        .finish()
    }
}

/// Registry of available database drivers
pub struct DriverRegistry {
    drivers: HashMap<ProviderKind, DriverHandle>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with every compiled-in driver registered
    pub fn with_defaults() -> Self {
        Self::with_settings(DocumentTimeouts::default())
    }

    /// Like [`Self::with_defaults`], with explicit document-store bounds
    pub fn with_settings(document_timeouts: DocumentTimeouts) -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register_relational(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "postgres")]
        registry.register_relational(Arc::new(crate::postgres::PostgresDriver::new()));
        #[cfg(feature = "mysql")]
        registry.register_relational(Arc::new(crate::mysql::MySqlDriver::new()));
        #[cfg(feature = "mssql")]
        registry.register_relational(Arc::new(crate::mssql::MssqlDriver::new()));

        #[cfg(feature = "mongodb")]
        registry.register_document(Arc::new(crate::mongodb::MongoDbDriver::with_timeouts(
            document_timeouts,
        )));
        #[cfg(not(feature = "mongodb"))]
        let _ = document_timeouts;

        registry
    }

    /// Register a relational driver, replacing any driver for the same provider
    pub fn register_relational(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let provider = driver.provider();
        tracing::info!(driver = %provider, "registering database driver");
        self.drivers.insert(provider, DriverHandle::Relational(driver));
    }

    /// Register a document driver, replacing any driver for the same provider
    pub fn register_document(&mut self, driver: Arc<dyn DocumentDriver>) {
        let provider = driver.provider();
        tracing::info!(driver = %provider, "registering document driver");
        self.drivers.insert(provider, DriverHandle::Document(driver));
    }

    /// Driver for a provider. Fails with `UnsupportedDriver` when the
    /// backend was not compiled in.
    pub fn resolve(&self, provider: ProviderKind) -> Result<DriverHandle> {
        self.drivers.get(&provider).cloned().ok_or_else(|| {
            tracing::warn!(driver = %provider, "driver not found in registry");
            TesseraError::UnsupportedDriver(provider.to_string())
        })
    }

    /// Driver for a free-form tag such as `"postgresql"` or `"mongo"`
    pub fn resolve_tag(&self, tag: &str) -> Result<DriverHandle> {
        self.resolve(tag.parse()?)
    }

    /// Relational driver for a provider
    pub fn relational(&self, provider: ProviderKind) -> Result<Arc<dyn DatabaseDriver>> {
        match self.resolve(provider)? {
            DriverHandle::Relational(driver) => Ok(driver),
            DriverHandle::Document(_) => Err(TesseraError::NotSupported(format!(
                "{} is a document store",
                provider
            ))),
        }
    }

    /// Document driver for a provider
    pub fn document(&self, provider: ProviderKind) -> Result<Arc<dyn DocumentDriver>> {
        match self.resolve(provider)? {
            DriverHandle::Document(driver) => Ok(driver),
            DriverHandle::Relational(_) => Err(TesseraError::NotSupported(format!(
                "{} is not a document store",
                provider
            ))),
        }
    }

    /// Registered providers in declaration order
    pub fn list(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|p| self.drivers.contains_key(p))
            .collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, provider: ProviderKind) -> bool {
        self.drivers.contains_key(&provider)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
