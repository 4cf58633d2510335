//! MongoDB driver for Tessera
//!
//! MongoDB is browsed, not edited: the crate implements the document-store
//! contract (database and collection listing, filtered document pages) and
//! takes no part in change tracking. Every call is bounded by the
//! [`tessera_core::DocumentTimeouts`] the driver was built with.

mod connection;
mod convert;
mod driver;

#[cfg(test)]
mod convert_tests;
#[cfg(test)]
mod driver_tests;

pub use connection::MongoDbConnection;
pub use convert::{parse_json_document, to_relaxed_json};
pub use driver::MongoDbDriver;
