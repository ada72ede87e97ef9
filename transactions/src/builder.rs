//! Constructors for the three transaction operations.
//!
//! Builders produce unsigned transactions with their id already computed.
//! `sign_transaction` then attaches fulfillments; signing never changes the id.

use fedchain_crypto::sign_message;
use fedchain_types::{
    Asset, Condition, FulfillmentSig, Input, KeyPair, Metadata, Operation, Output, PublicKey,
    Transaction, TransactionLink, TxId, TX_VERSION,
};

use crate::{compute_id, signing_message, TransactionError};

/// An output to be created: who owns it and how much it carries.
#[derive(Clone, Debug)]
pub struct OutputSpec {
    pub public_keys: Vec<PublicKey>,
    pub amount: u64,
}

impl OutputSpec {
    pub fn new(public_keys: Vec<PublicKey>, amount: u64) -> Self {
        Self {
            public_keys,
            amount,
        }
    }

    fn into_output(self) -> Output {
        let threshold = self.public_keys.len() as u32;
        Output {
            amount: self.amount,
            public_keys: self.public_keys,
            condition: Condition { threshold },
        }
    }
}

fn finish(mut tx: Transaction) -> Result<Transaction, TransactionError> {
    tx.id = compute_id(&tx)?;
    Ok(tx)
}

/// Mint a new asset owned by `outputs`. All `creators` must later sign.
pub fn create(
    creators: Vec<PublicKey>,
    outputs: Vec<OutputSpec>,
    asset_data: Option<Metadata>,
    metadata: Option<Metadata>,
) -> Result<Transaction, TransactionError> {
    finish(Transaction {
        id: TxId::ZERO,
        version: TX_VERSION.to_string(),
        operation: Operation::Create,
        inputs: vec![Input {
            owners_before: creators,
            fulfills: None,
            fulfillment: None,
        }],
        outputs: outputs.into_iter().map(OutputSpec::into_output).collect(),
        asset: Asset {
            id: None,
            data: asset_data,
        },
        metadata,
    })
}

/// Move the outputs referenced by `inputs` (see [`to_inputs`]) to new owners.
pub fn transfer(
    inputs: Vec<Input>,
    outputs: Vec<OutputSpec>,
    asset_id: TxId,
    metadata: Option<Metadata>,
) -> Result<Transaction, TransactionError> {
    finish(Transaction {
        id: TxId::ZERO,
        version: TX_VERSION.to_string(),
        operation: Operation::Transfer,
        inputs,
        outputs: outputs.into_iter().map(OutputSpec::into_output).collect(),
        asset: Asset {
            id: Some(asset_id),
            data: None,
        },
        metadata,
    })
}

/// The single transaction of the genesis block, created by `node`.
pub fn genesis(node: PublicKey) -> Result<Transaction, TransactionError> {
    let mut metadata = Metadata::new();
    metadata.insert(
        "message".into(),
        serde_json::Value::String("Hello World from fedchain".into()),
    );
    finish(Transaction {
        id: TxId::ZERO,
        version: TX_VERSION.to_string(),
        operation: Operation::Genesis,
        inputs: vec![Input {
            owners_before: vec![node],
            fulfills: None,
            fulfillment: None,
        }],
        outputs: vec![OutputSpec::new(vec![node], 1).into_output()],
        asset: Asset::default(),
        metadata: Some(metadata),
    })
}

/// Unsigned inputs spending the given outputs of `tx`.
///
/// `None` spends every output. Indices past the end are skipped.
pub fn to_inputs(tx: &Transaction, indices: Option<&[u32]>) -> Vec<Input> {
    let link = |index: u32, output: &Output| Input {
        owners_before: output.public_keys.clone(),
        fulfills: Some(TransactionLink {
            transaction_id: tx.id,
            output_index: index,
        }),
        fulfillment: None,
    };
    match indices {
        Some(indices) => indices
            .iter()
            .filter_map(|&i| tx.outputs.get(i as usize).map(|o| link(i, o)))
            .collect(),
        None => tx
            .outputs
            .iter()
            .enumerate()
            .map(|(i, o)| link(i as u32, o))
            .collect(),
    }
}

/// Sign every input with each key in `signers` that appears in its
/// `owners_before`. Existing fulfillments are replaced.
pub fn sign_transaction(mut tx: Transaction, signers: &[&KeyPair]) -> Transaction {
    let id = tx.id;
    for input in &mut tx.inputs {
        let message = signing_message(&id, input.fulfills.as_ref());
        let sigs: Vec<FulfillmentSig> = signers
            .iter()
            .filter(|kp| input.owners_before.contains(&kp.public))
            .map(|kp| FulfillmentSig {
                public_key: kp.public,
                signature: sign_message(&message, &kp.private),
            })
            .collect();
        input.fulfillment = Some(sigs);
    }
    tx
}
