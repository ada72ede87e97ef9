//! Request-facing façade: parameter validation, submission and lookup.
//!
//! Transport-agnostic. Every failure is an [`ApiError`] carrying the HTTP
//! status a web layer would answer with.

use std::sync::Arc;
use std::time::Instant;

use fedchain_ledger::{BlockStatus, LedgerError};
use fedchain_store::{BacklogStore, StoreError, TransactionIndex};
use fedchain_transactions::TransactionError;
use fedchain_types::{Clock, ErrorKind, Operation, Transaction, TxId};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{FedNode, NodeError};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            message: "Not found".into(),
        }
    }

    fn from_kind(kind: ErrorKind, message: String) -> Self {
        let status = match kind {
            ErrorKind::Validation | ErrorKind::LedgerConsistency => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Connectivity => 503,
            ErrorKind::DataCorruption | ErrorKind::Internal => 500,
        };
        Self { status, message }
    }
}

impl From<TransactionError> for ApiError {
    fn from(e: TransactionError) -> Self {
        match &e {
            TransactionError::SchemaValidation(cause) => {
                Self::bad_request(format!("Invalid transaction schema: {cause}"))
            }
            _ => Self::from_kind(
                e.kind(),
                format!("Invalid transaction ({}): {e}", e.name()),
            ),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Transaction(e) => e.into(),
            LedgerError::Store(e) => e.into(),
            other => Self::from_kind(other.kind(), other.to_string()),
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::Ledger(e) => e.into(),
            NodeError::Store(e) => e.into(),
            NodeError::Transaction(e) => e.into(),
            other => Self::from_kind(other.kind(), other.to_string()),
        }
    }
}

/// A 64-character hex transaction id, case-insensitive.
pub fn valid_txid(value: &str) -> Result<TxId, ApiError> {
    if value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(id) = value.to_ascii_lowercase().parse() {
            return Ok(id);
        }
    }
    Err(ApiError::bad_request(format!("Invalid transaction id: {value:?}")))
}

/// Only the literal strings `true` and `false`.
pub fn valid_bool(value: &str) -> Result<bool, ApiError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ApiError::bad_request(format!("Invalid boolean: {other:?}"))),
    }
}

/// A base58 string of 43 or 44 characters, the length of an encoded
/// Ed25519 public key.
pub fn valid_ed25519(value: &str) -> Result<String, ApiError> {
    let shaped = matches!(value.len(), 43 | 44)
        && value.chars().all(|c| BASE58_ALPHABET.contains(c));
    if shaped {
        Ok(value.to_string())
    } else {
        Err(ApiError::bad_request(format!("Invalid public key: {value:?}")))
    }
}

/// `CREATE` or `TRANSFER`; clients never query GENESIS.
pub fn valid_operation(value: &str) -> Result<Operation, ApiError> {
    match value {
        "CREATE" => Ok(Operation::Create),
        "TRANSFER" => Ok(Operation::Transfer),
        other => Err(ApiError::bad_request(format!("Invalid operation: {other:?}"))),
    }
}

/// Validate `payload` and queue it. Returns the transaction as accepted.
pub async fn submit_transaction(node: &FedNode, payload: Value) -> Result<Value, ApiError> {
    node.metrics.transactions_received.inc();
    let started = Instant::now();
    let validator = Arc::clone(&node.validator);
    let backlog = Arc::clone(&node.backlog);
    let now = node.clock.now();

    let outcome = node
        .pool
        .run(move || validator.admit(&payload, &backlog, now))
        .await?;
    node.metrics
        .write_transaction_ms
        .observe(started.elapsed().as_secs_f64() * 1000.0);

    match outcome {
        Ok((tx, queued)) => {
            node.metrics.transactions_admitted.inc();
            info!(tx_id = %tx.id, operation = %tx.operation, queued, "transaction accepted");
            serde_json::to_value(&tx)
                .map_err(|e| ApiError::from_kind(ErrorKind::Internal, e.to_string()))
        }
        Err(e) => {
            node.metrics.transactions_rejected.inc();
            debug!(error = %e, "transaction rejected");
            Err(e.into())
        }
    }
}

/// A transaction from a VALID or UNDECIDED block, else from the backlog.
pub async fn get_transaction(node: &FedNode, tx_id: &str) -> Result<Value, ApiError> {
    let id = valid_txid(tx_id)?;
    let store = Arc::clone(&node.store);
    let found = node
        .pool
        .run(move || -> Result<Option<Transaction>, LedgerError> {
            if let Some(located) = fedchain_ledger::get_transaction(&*store, &id)? {
                if located.status != BlockStatus::Invalid {
                    return Ok(Some(located.transaction));
                }
            }
            Ok(store.get_transaction_from_backlog(&id)?)
        })
        .await??;

    let tx = found.ok_or_else(ApiError::not_found)?;
    serde_json::to_value(&tx).map_err(|e| ApiError::from_kind(ErrorKind::Internal, e.to_string()))
}

/// Ids of written transactions matching the filters. At least one filter
/// is required.
pub async fn list_transactions(
    node: &FedNode,
    asset_id: Option<&str>,
    operation: Option<&str>,
) -> Result<Vec<TxId>, ApiError> {
    let asset_id = asset_id.map(valid_txid).transpose()?;
    let operation = operation.map(valid_operation).transpose()?;
    if asset_id.is_none() && operation.is_none() {
        return Err(ApiError::bad_request("One of asset_id or operation required"));
    }

    let store = Arc::clone(&node.store);
    let ids = node
        .pool
        .run(move || -> Result<Vec<TxId>, StoreError> {
            store
                .get_transactions_list(asset_id.as_ref(), operation)?
                .collect()
        })
        .await??;
    Ok(ids)
}
