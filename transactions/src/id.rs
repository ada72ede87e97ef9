//! Content addressing and signing messages.

use fedchain_crypto::content_hash;
use fedchain_types::{Asset, Metadata, Operation, Output, PublicKey, Transaction, TransactionLink, TxId};
use serde::Serialize;

use crate::TransactionError;

/// The hashed view of a transaction: no id, no fulfillments.
#[derive(Serialize)]
struct UnsignedBody<'a> {
    version: &'a str,
    operation: Operation,
    inputs: Vec<UnsignedInput<'a>>,
    outputs: &'a [Output],
    asset: &'a Asset,
    metadata: &'a Option<Metadata>,
}

#[derive(Serialize)]
struct UnsignedInput<'a> {
    owners_before: &'a [PublicKey],
    fulfills: &'a Option<TransactionLink>,
}

/// Compute the content-addressed id of `tx`.
///
/// Signatures are excluded so that signing does not change the id.
pub fn compute_id(tx: &Transaction) -> Result<TxId, TransactionError> {
    let body = UnsignedBody {
        version: &tx.version,
        operation: tx.operation,
        inputs: tx
            .inputs
            .iter()
            .map(|i| UnsignedInput {
                owners_before: &i.owners_before,
                fulfills: &i.fulfills,
            })
            .collect(),
        outputs: &tx.outputs,
        asset: &tx.asset,
        metadata: &tx.metadata,
    };
    Ok(TxId::new(content_hash(&body)?))
}

/// Bytes an owner signs to fulfill one input: the transaction id followed by
/// the spent output reference, if any.
pub fn signing_message(id: &TxId, fulfills: Option<&TransactionLink>) -> Vec<u8> {
    let mut msg = Vec::with_capacity(32 + 36);
    msg.extend_from_slice(id.as_bytes());
    if let Some(link) = fulfills {
        msg.extend_from_slice(link.transaction_id.as_bytes());
        msg.extend_from_slice(&link.output_index.to_be_bytes());
    }
    msg
}
