//! The transaction record.
//!
//! A transaction is immutable once signed. Its id is the hash of its
//! signature-free body (see `fedchain_transactions::compute_id`), so two
//! transactions with the same content always share an id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{PublicKey, Signature, TxId, TypesError};

/// The only transaction format version this node understands.
pub const TX_VERSION: &str = "1.0";

/// Free-form JSON metadata attached to a transaction. Must be non-empty when present.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// What a transaction does to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Mints a new asset; the asset id is the transaction id.
    Create,
    /// Moves outputs of earlier transactions of the same asset.
    Transfer,
    /// The single transaction of the genesis block.
    Genesis,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Transfer => "TRANSFER",
            Self::Genesis => "GENESIS",
        }
    }

    /// Whether this operation mints its own asset.
    pub fn is_minting(&self) -> bool {
        matches!(self, Self::Create | Self::Genesis)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "TRANSFER" => Ok(Self::Transfer),
            "GENESIS" => Ok(Self::Genesis),
            other => Err(TypesError::UnknownOperation(other.to_string())),
        }
    }
}

/// Reference to a single output of an earlier transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionLink {
    pub transaction_id: TxId,
    pub output_index: u32,
}

/// One owner's signature over an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FulfillmentSig {
    pub public_key: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    /// Keys that owned the referenced output (or the creators, for CREATE).
    pub owners_before: Vec<PublicKey>,
    /// The output being spent. `None` for CREATE and GENESIS.
    pub fulfills: Option<TransactionLink>,
    /// Signatures proving control of `owners_before`. `None` while unsigned.
    pub fulfillment: Option<Vec<FulfillmentSig>>,
}

/// Spending condition: how many of the output's keys must sign to spend it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub threshold: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub amount: u64,
    pub public_keys: Vec<PublicKey>,
    pub condition: Condition,
}

/// Asset payload. CREATE and GENESIS carry `data`; TRANSFER carries the
/// `id` of the CREATE transaction that minted the asset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Asset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub id: TxId,
    pub version: String,
    pub operation: Operation,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub asset: Asset,
    pub metadata: Option<Metadata>,
}

impl Transaction {
    /// The id of the asset this transaction moves.
    ///
    /// Minting transactions are their own asset; a TRANSFER without an
    /// `asset.id` has none.
    pub fn asset_id(&self) -> Option<TxId> {
        if self.operation.is_minting() {
            Some(self.id)
        } else {
            self.asset.id
        }
    }

    /// Output references consumed by this transaction.
    pub fn spends(&self) -> impl Iterator<Item = &TransactionLink> {
        self.inputs.iter().filter_map(|i| i.fulfills.as_ref())
    }

    /// Whether any input of this transaction spends `(txid, output_index)`.
    pub fn fulfills(&self, txid: &TxId, output_index: u32) -> bool {
        self.spends()
            .any(|l| l.transaction_id == *txid && l.output_index == output_index)
    }

    /// Whether any output is addressed to `owner`.
    pub fn pays_to(&self, owner: &PublicKey) -> bool {
        self.outputs.iter().any(|o| o.public_keys.contains(owner))
    }

    /// Sum of all output amounts, `None` on overflow.
    pub fn output_total(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PublicKey {
        PublicKey([b; 32])
    }

    fn transfer_of(asset: TxId, spent: TxId) -> Transaction {
        Transaction {
            id: TxId::new([9; 32]),
            version: TX_VERSION.to_string(),
            operation: Operation::Transfer,
            inputs: vec![Input {
                owners_before: vec![pk(1)],
                fulfills: Some(TransactionLink {
                    transaction_id: spent,
                    output_index: 1,
                }),
                fulfillment: None,
            }],
            outputs: vec![Output {
                amount: 5,
                public_keys: vec![pk(2)],
                condition: Condition { threshold: 1 },
            }],
            asset: Asset {
                id: Some(asset),
                data: None,
            },
            metadata: None,
        }
    }

    #[test]
    fn operation_parses_only_exact_upper_case() {
        assert_eq!("CREATE".parse::<Operation>().unwrap(), Operation::Create);
        assert_eq!("TRANSFER".parse::<Operation>().unwrap(), Operation::Transfer);
        assert!("create".parse::<Operation>().is_err());
        assert!("".parse::<Operation>().is_err());
    }

    #[test]
    fn transfer_asset_id_comes_from_asset_field() {
        let asset = TxId::new([3; 32]);
        let tx = transfer_of(asset, TxId::new([4; 32]));
        assert_eq!(tx.asset_id(), Some(asset));
    }

    #[test]
    fn fulfills_matches_txid_and_index() {
        let spent = TxId::new([4; 32]);
        let tx = transfer_of(TxId::new([3; 32]), spent);
        assert!(tx.fulfills(&spent, 1));
        assert!(!tx.fulfills(&spent, 0));
        assert!(!tx.fulfills(&TxId::new([5; 32]), 1));
    }

    #[test]
    fn pays_to_checks_output_keys() {
        let tx = transfer_of(TxId::new([3; 32]), TxId::new([4; 32]));
        assert!(tx.pays_to(&pk(2)));
        assert!(!tx.pays_to(&pk(1)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let tx = transfer_of(TxId::new([3; 32]), TxId::new([4; 32]));
        let mut value = serde_json::to_value(&tx).unwrap();
        value["surprise"] = serde_json::json!(true);
        assert!(serde_json::from_value::<Transaction>(value).is_err());
    }
}
