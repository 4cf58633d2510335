//! MySQL/MariaDB database driver implementation

mod connection;
mod dialect;
mod driver;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod dialect_tests;

pub use connection::{MySqlCancelHandle, MySqlConnection};
pub use dialect::{MYSQL_DIALECT, MySqlDialect};
pub use driver::MySqlDriver;
