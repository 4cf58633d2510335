//! PostgreSQL database driver implementation

mod connection;
mod convert;
mod dialect;
mod driver;
mod schema;

#[cfg(test)]
mod convert_tests;
#[cfg(test)]
mod dialect_tests;

pub use connection::{PostgresCancelHandle, PostgresConnection};
pub use dialect::{POSTGRES_DIALECT, PostgresDialect};
pub use driver::PostgresDriver;
