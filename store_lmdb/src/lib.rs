//! LMDB storage backend for fedchain.
//!
//! Implements every query trait from `fedchain-store` using the `heed` LMDB
//! bindings. The logical collections (`backlog`, `bigchain`, `votes`,
//! `meta`) each map to one LMDB database, plus a few key-only index
//! databases that keep the common lookups off full scans.

pub mod backlog;
pub mod block;
mod codec;
pub mod connector;
mod cursor;
pub mod environment;
pub mod error;
pub mod index;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod store;
pub mod vote;

pub use connector::LmdbConnector;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::IntegrityReport;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use store::LmdbStore;
