//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use fedchain_store::{BackendConfig, BackendKind, RetryPolicy};
use fedchain_types::PublicKey;

use crate::NodeError;

/// Configuration for a fedchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Storage backend: "lmdb" or "memory".
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub lmdb_map_size: usize,

    /// Connection attempts before a store operation fails.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Base of the exponential backoff between attempts.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Age after which a backlog assignment counts as stale.
    #[serde(default = "default_reassign_delay")]
    pub reassign_delay_secs: u64,

    /// How often the reassignment sweep runs.
    #[serde(default = "default_reassign_interval")]
    pub reassign_interval_secs: u64,

    /// Maximum number of store queries in flight.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Node signing key. Generated on `node init` when missing.
    #[serde(default = "default_keypair_path")]
    pub keypair_path: PathBuf,

    /// Public keys of every federation member, this node included.
    #[serde(default)]
    pub federation: Vec<PublicKey>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,
}

fn default_backend() -> BackendKind {
    BackendKind::Lmdb
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./fedchain_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_max_tries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_reassign_delay() -> u64 {
    120
}

fn default_reassign_interval() -> u64 {
    30
}

fn default_pool_size() -> usize {
    16
}

fn default_keypair_path() -> PathBuf {
    PathBuf::from("./fedchain_data/node.key")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.max_tries == 0 {
            return Err(NodeError::Config("max_tries must be at least 1".into()));
        }
        if self.pool_size == 0 {
            return Err(NodeError::Config("pool_size must be at least 1".into()));
        }
        if self.reassign_interval_secs == 0 {
            return Err(NodeError::Config(
                "reassign_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_tries, Duration::from_millis(self.backoff_base_ms))
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            kind: self.backend,
            data_dir: self.data_dir.clone(),
            lmdb_map_size: self.lmdb_map_size,
            retry: self.retry_policy(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_map_size(),
            max_tries: default_max_tries(),
            backoff_base_ms: default_backoff_base_ms(),
            reassign_delay_secs: default_reassign_delay(),
            reassign_interval_secs: default_reassign_interval(),
            pool_size: default_pool_size(),
            keypair_path: default_keypair_path(),
            federation: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
