//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (clock, storage, connections, randomness) sit
//! behind traits. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! `NullStore` doubles as the `memory` backend: a complete in-memory ledger
//! store with its own index-based query shapes.

pub mod clock;
pub mod connector;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use connector::{FlakyConnector, MemoryConnector};
pub use random::NullRandom;
pub use store::{MemoryDb, NullStore};
