//! Tessera Drivers - backend implementations and the driver factory
//!
//! Each backend lives in its own crate behind a cargo feature. The
//! [`DriverRegistry`] turns a provider tag into the matching relational or
//! document driver.

#[cfg(feature = "mssql")]
pub use tessera_driver_mssql as mssql;
#[cfg(feature = "mysql")]
pub use tessera_driver_mysql as mysql;
#[cfg(feature = "postgres")]
pub use tessera_driver_postgres as postgres;
#[cfg(feature = "sqlite")]
pub use tessera_driver_sqlite as sqlite;

#[cfg(feature = "mongodb")]
pub use tessera_driver_mongodb as mongodb;

mod registry;

pub use registry::{DriverHandle, DriverRegistry};

/// Re-export commonly used types from tessera-core
pub use tessera_core::{
    Connection, ConnectionConfig, DatabaseDriver, DocumentConnection, DocumentDriver,
    DocumentTimeouts, ProviderKind, QueryResult, Result, Row, SchemaIntrospection,
    StatementResult, TesseraError, Transaction, Value,
};

#[cfg(test)]
mod registry_tests;
