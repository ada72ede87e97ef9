//! fedchain node: wires a ledger store, the admission pipeline and the
//! backlog reassignment task into one service.
//!
//! - Opens the configured backend through the [`QueryRegistry`]
//!   (`lmdb` or `memory`).
//! - Writes the genesis block on first start.
//! - Serves transaction submission and lookup through [`api`], running
//!   each store query on a bounded pool of blocking workers.
//! - Periodically hands stale backlog entries to another federation node.
//!
//! [`QueryRegistry`]: fedchain_store::QueryRegistry

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod pool;
pub mod shutdown;

pub use api::{valid_bool, valid_ed25519, valid_operation, valid_txid, ApiError};
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::FedNode;
pub use pool::WorkerPool;
pub use shutdown::ShutdownController;
