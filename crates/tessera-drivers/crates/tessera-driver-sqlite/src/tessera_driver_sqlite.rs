//! SQLite database driver implementation

mod connection;
mod dialect;
mod driver;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod dialect_tests;

pub use connection::{SqliteCancelHandle, SqliteConnection};
pub use dialect::{SQLITE_DIALECT, SqliteDialect};
pub use driver::SqliteDriver;
