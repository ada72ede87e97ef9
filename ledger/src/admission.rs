//! The checks a client transaction passes before it reaches the backlog.

use std::collections::HashSet;
use std::sync::Arc;

use fedchain_store::{LedgerStore, TransactionIndex};
use fedchain_transactions::{
    validate_amounts, validate_create_payload, validate_id, validate_signatures,
    validate_transaction_schema, TransactionError,
};
use fedchain_types::{Operation, Timestamp, Transaction};
use serde_json::Value;
use tracing::debug;

use crate::{get_transaction, BacklogManager, BlockStatus, LedgerError};

pub struct AdmissionValidator {
    store: Arc<dyn LedgerStore>,
}

impl AdmissionValidator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Run the full pipeline over a JSON payload, stopping at the first
    /// failure. Nothing is written.
    ///
    /// Ledger checks on inputs come before the output amount checks, so a
    /// transaction failing both reports the input failure.
    pub fn validate(&self, payload: &Value) -> Result<Transaction, LedgerError> {
        let tx = validate_transaction_schema(payload)?;
        validate_id(&tx)?;
        validate_signatures(&tx)?;
        let input_total = match tx.operation {
            Operation::Transfer => Some(self.validate_spends(&tx)?),
            _ => None,
        };
        validate_amounts(&tx)?;
        if let Some(input_total) = input_total {
            let output_total = tx.output_total().unwrap_or(u64::MAX);
            if input_total != output_total {
                return Err(TransactionError::AmountError(format!(
                    "inputs carry {input_total} but outputs carry {output_total}"
                ))
                .into());
            }
        }
        validate_create_payload(&tx)?;
        Ok(tx)
    }

    /// Validate, then queue. Returns the transaction and whether it was new
    /// to the backlog.
    ///
    /// A transaction already in a VALID or UNDECIDED block is not queued
    /// again; only copies in INVALID blocks are retried.
    pub fn admit(
        &self,
        payload: &Value,
        backlog: &BacklogManager,
        now: Timestamp,
    ) -> Result<(Transaction, bool), LedgerError> {
        let tx = self.validate(payload)?;
        if let Some(located) = get_transaction(&*self.store, &tx.id)? {
            if located.status != BlockStatus::Invalid {
                debug!(
                    tx_id = %tx.id,
                    block_id = %located.block_id,
                    status = ?located.status,
                    "transaction already committed"
                );
                return Ok((tx, false));
            }
        }
        let queued = backlog.insert(tx.clone(), now)?;
        debug!(tx_id = %tx.id, queued, "transaction admitted");
        Ok((tx, queued))
    }

    /// TRANSFER ledger checks. Returns the summed input amount.
    fn validate_spends(&self, tx: &Transaction) -> Result<u64, LedgerError> {
        let store = &*self.store;
        let asset_id = tx.asset.id;
        let mut seen = HashSet::new();
        let mut total: u64 = 0;

        for (i, input) in tx.inputs.iter().enumerate() {
            let Some(link) = &input.fulfills else {
                return Err(TransactionError::SchemaValidation(format!(
                    "input {i} does not reference an output"
                ))
                .into());
            };
            if !seen.insert((link.transaction_id, link.output_index)) {
                return Err(TransactionError::DoubleSpend {
                    txid: link.transaction_id.to_string(),
                    output_index: link.output_index,
                }
                .into());
            }

            let located = get_transaction(store, &link.transaction_id)?.ok_or_else(|| {
                TransactionError::TransactionDoesNotExist(link.transaction_id.to_string())
            })?;
            if located.status != BlockStatus::Valid {
                return Err(TransactionError::TransactionNotInValidBlock(format!(
                    "{} is in block {} with status {:?}",
                    link.transaction_id, located.block_id, located.status
                ))
                .into());
            }
            let input_tx = located.transaction;

            let output = input_tx.outputs.get(link.output_index as usize).ok_or_else(|| {
                TransactionError::TransactionDoesNotExist(format!(
                    "{} has no output {}",
                    link.transaction_id, link.output_index
                ))
            })?;

            for spender in store.get_spent(&link.transaction_id, link.output_index)? {
                let spender = spender?;
                // A resubmission finds its own committed copy.
                if spender.id == tx.id {
                    continue;
                }
                let committed = get_transaction(store, &spender.id)?;
                if committed.is_some_and(|c| c.status != BlockStatus::Invalid) {
                    return Err(TransactionError::DoubleSpend {
                        txid: link.transaction_id.to_string(),
                        output_index: link.output_index,
                    }
                    .into());
                }
            }

            let mut owners = input.owners_before.clone();
            let mut expected = output.public_keys.clone();
            owners.sort();
            expected.sort();
            if owners != expected {
                return Err(TransactionError::TransactionOwnerError(format!(
                    "input {i} owners do not match output {} of {}",
                    link.output_index, link.transaction_id
                ))
                .into());
            }
            let signed = input.fulfillment.as_ref().map_or(0, Vec::len);
            if (signed as u32) < output.condition.threshold {
                return Err(TransactionError::TransactionOwnerError(format!(
                    "input {i}: {signed} signatures, threshold {}",
                    output.condition.threshold
                ))
                .into());
            }

            if input_tx.asset_id() != asset_id {
                return Err(TransactionError::AssetIdMismatch(format!(
                    "input {i} spends asset {:?}, transaction declares {:?}",
                    input_tx.asset_id().map(|a| a.to_string()),
                    asset_id.map(|a| a.to_string())
                ))
                .into());
            }

            total = total.checked_add(output.amount).ok_or_else(|| {
                TransactionError::AmountError("input total overflows".into())
            })?;
        }
        Ok(total)
    }
}
