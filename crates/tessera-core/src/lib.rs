//! Tessera Core - change tracking and query execution primitives
//!
//! This crate provides the traits and types the drivers and the client
//! share:
//!
//! - `DatabaseDriver` / `Connection` - the relational driver contract
//! - `DocumentDriver` / `DocumentConnection` - the document-store contract
//! - `SqlDialect` - identifier quoting, placeholders and literal rendering
//! - `dml` - the pending change set, query builder and transactional executor
//! - `guard` - the read-only mutation classifier

mod connection;
mod dialect;
pub mod dml;
mod document;
mod driver;
mod error;
pub mod guard;
mod records;
mod schema;
mod types;

pub use connection::*;
pub use dialect::*;
pub use document::*;
pub use driver::*;
pub use error::*;
pub use guard::{is_query_mutation, validate_query_for_read_only};
pub use records::*;
pub use schema::*;
pub use types::*;
