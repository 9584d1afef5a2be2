//! Document store abstraction.
//!
//! The [`DocumentStore`] trait is the only path to the database. Every call
//! through it carries the server-side execution ceiling.

pub mod connection;
#[cfg(test)]
pub mod memory;
pub mod mongo;
pub mod serialize;
pub mod traits;
pub mod value;

pub use connection::{ConnectionManager, ConnectionMetadata, ConnectionState};
pub use mongo::MongoStore;
pub use serialize::{documents_to_json, from_extended_json, to_relaxed_json};
pub use traits::{DocumentStore, ExplainTarget, ExplainVerbosity, FindRequest};
pub use value::{Node, ValueKind};
