//! MS SQL Server driver for Tessera
//!
//! Connects over TDS with tiberius. Tables are addressed by schema
//! (`dbo` when none is given) within the database named at connect time.

mod connection;
mod dialect;
mod driver;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod dialect_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use dialect::{MSSQL_DIALECT, MssqlDialect};
pub use driver::MssqlDriver;
