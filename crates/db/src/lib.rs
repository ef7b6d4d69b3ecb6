//! `db` crate — pure persistence layer.
//!
//! Describes requests against the hosted invoicing store as [`Query`] values
//! and executes them through the [`QueryStore`] trait.  Two stores ship here:
//! [`RestStore`] talks to the hosted PostgREST endpoint, [`MemoryStore`] keeps
//! tables in process for tests and local runs.  No business logic lives here.

pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod rest;
pub mod store;

pub use config::StoreConfig;
pub use error::{ConfigError, DbError};
pub use memory::MemoryStore;
pub use query::{
    Columns, Direction, Filter, Operation, OperationKind, Operator, Order, Query, Relation,
    RelationKind,
};
pub use rest::{connect, RestStore};
pub use store::{QueryStore, Row};
