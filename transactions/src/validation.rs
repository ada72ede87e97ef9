//! Stateless transaction checks.
//!
//! Each function checks one property and fails with the matching
//! [`TransactionError`] class. None of them touch storage.

use std::collections::HashSet;

use fedchain_crypto::verify_signature;
use fedchain_types::{Operation, Transaction};

use crate::{compute_id, signing_message, TransactionError};

/// Largest amount a single output may carry.
pub const MAX_AMOUNT: u64 = 9_000_000_000_000_000_000;

/// The declared id must equal the content hash.
pub fn validate_id(tx: &Transaction) -> Result<(), TransactionError> {
    let expected = compute_id(tx)?;
    if expected != tx.id {
        return Err(TransactionError::InvalidHash {
            expected: expected.to_string(),
            actual: tx.id.to_string(),
        });
    }
    Ok(())
}

/// Every input carries valid signatures from distinct members of its
/// `owners_before`. Minting inputs need every owner to sign; TRANSFER
/// thresholds depend on the spent output and are checked against ledger state.
pub fn validate_signatures(tx: &Transaction) -> Result<(), TransactionError> {
    for (i, input) in tx.inputs.iter().enumerate() {
        let sigs = match &input.fulfillment {
            Some(sigs) if !sigs.is_empty() => sigs,
            _ => {
                return Err(TransactionError::InvalidSignature(format!(
                    "input {i} is not signed"
                )))
            }
        };
        let message = signing_message(&tx.id, input.fulfills.as_ref());
        let mut signers = HashSet::new();
        for sig in sigs {
            if !input.owners_before.contains(&sig.public_key) {
                return Err(TransactionError::InvalidSignature(format!(
                    "input {i}: {} is not an owner",
                    sig.public_key
                )));
            }
            if !signers.insert(sig.public_key) {
                return Err(TransactionError::InvalidSignature(format!(
                    "input {i}: duplicate signature from {}",
                    sig.public_key
                )));
            }
            if !verify_signature(&message, &sig.signature, &sig.public_key) {
                return Err(TransactionError::InvalidSignature(format!(
                    "input {i}: bad signature from {}",
                    sig.public_key
                )));
            }
        }
        if tx.operation.is_minting() && signers.len() != input.owners_before.len() {
            return Err(TransactionError::InvalidSignature(format!(
                "input {i}: {} of {} creators signed",
                signers.len(),
                input.owners_before.len()
            )));
        }
    }
    Ok(())
}

/// Every output amount lies in `1..=MAX_AMOUNT` and the total does not overflow.
pub fn validate_amounts(tx: &Transaction) -> Result<(), TransactionError> {
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.amount == 0 || output.amount > MAX_AMOUNT {
            return Err(TransactionError::AmountError(format!(
                "output {i}: amount {} out of range 1..={MAX_AMOUNT}",
                output.amount
            )));
        }
    }
    if tx.output_total().is_none() {
        return Err(TransactionError::AmountError("output total overflows".into()));
    }
    Ok(())
}

/// CREATE payload rules: no asset id, and metadata non-empty when present.
pub fn validate_create_payload(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.operation != Operation::Create {
        return Ok(());
    }
    if tx.asset.id.is_some() {
        return Err(TransactionError::SchemaValidation(
            "CREATE asset must not carry an id".into(),
        ));
    }
    if tx.asset.data.as_ref().is_some_and(|d| d.keys().any(|k| k.is_empty())) {
        return Err(TransactionError::SchemaValidation(
            "asset data keys must not be empty".into(),
        ));
    }
    if tx.metadata.as_ref().is_some_and(|m| m.is_empty()) {
        return Err(TransactionError::SchemaValidation(
            "metadata must not be an empty object".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create, sign_transaction, to_inputs, transfer, OutputSpec};
    use fedchain_crypto::keypair_from_seed;
    use fedchain_types::{KeyPair, TxId};

    fn minted(owner: &KeyPair, amount: u64) -> Transaction {
        let tx = create(
            vec![owner.public],
            vec![OutputSpec::new(vec![owner.public], amount)],
            None,
            None,
        )
        .unwrap();
        sign_transaction(tx, &[owner])
    }

    #[test]
    fn signed_create_passes() {
        let alice = keypair_from_seed(&[1; 32]);
        let tx = minted(&alice, 5);
        validate_id(&tx).unwrap();
        validate_signatures(&tx).unwrap();
        validate_amounts(&tx).unwrap();
        validate_create_payload(&tx).unwrap();
    }

    #[test]
    fn tampered_id_fails() {
        let alice = keypair_from_seed(&[1; 32]);
        let mut tx = minted(&alice, 5);
        tx.id = TxId::new([1; 32]);
        assert!(matches!(
            validate_id(&tx),
            Err(TransactionError::InvalidHash { .. })
        ));
    }

    #[test]
    fn tampered_amount_breaks_hash() {
        let alice = keypair_from_seed(&[1; 32]);
        let mut tx = minted(&alice, 5);
        tx.outputs[0].amount = 6;
        assert!(validate_id(&tx).is_err());
    }

    #[test]
    fn unsigned_input_fails() {
        let alice = keypair_from_seed(&[1; 32]);
        let tx = create(
            vec![alice.public],
            vec![OutputSpec::new(vec![alice.public], 1)],
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            validate_signatures(&tx),
            Err(TransactionError::InvalidSignature(_))
        ));
    }

    #[test]
    fn create_needs_every_creator() {
        let alice = keypair_from_seed(&[1; 32]);
        let bob = keypair_from_seed(&[2; 32]);
        let tx = create(
            vec![alice.public, bob.public],
            vec![OutputSpec::new(vec![alice.public], 1)],
            None,
            None,
        )
        .unwrap();
        let half = sign_transaction(tx.clone(), &[&alice]);
        assert!(validate_signatures(&half).is_err());
        let full = sign_transaction(tx, &[&alice, &bob]);
        validate_signatures(&full).unwrap();
    }

    #[test]
    fn signature_for_other_message_fails() {
        let alice = keypair_from_seed(&[1; 32]);
        let a = minted(&alice, 1);
        let mut b = create(
            vec![alice.public],
            vec![OutputSpec::new(vec![alice.public], 2)],
            None,
            None,
        )
        .unwrap();
        b.inputs[0].fulfillment = a.inputs[0].fulfillment.clone();
        assert!(validate_signatures(&b).is_err());
    }

    #[test]
    fn transfer_signature_covers_spent_output() {
        let alice = keypair_from_seed(&[1; 32]);
        let bob = keypair_from_seed(&[2; 32]);
        let c = minted(&alice, 5);
        let t = transfer(
            to_inputs(&c, None),
            vec![OutputSpec::new(vec![bob.public], 5)],
            c.id,
            None,
        )
        .unwrap();
        let t = sign_transaction(t, &[&alice]);
        validate_id(&t).unwrap();
        validate_signatures(&t).unwrap();

        let mut forged = t.clone();
        forged.inputs[0].fulfills.as_mut().unwrap().output_index = 1;
        forged.id = compute_id(&forged).unwrap();
        assert!(validate_signatures(&forged).is_err());
    }

    #[test]
    fn zero_and_oversized_amounts_fail() {
        let alice = keypair_from_seed(&[1; 32]);
        let mut tx = minted(&alice, 1);
        tx.outputs[0].amount = 0;
        assert!(matches!(
            validate_amounts(&tx),
            Err(TransactionError::AmountError(_))
        ));
        tx.outputs[0].amount = MAX_AMOUNT + 1;
        assert!(validate_amounts(&tx).is_err());
        tx.outputs[0].amount = MAX_AMOUNT;
        validate_amounts(&tx).unwrap();
    }

    #[test]
    fn empty_metadata_fails_payload_check() {
        let alice = keypair_from_seed(&[1; 32]);
        let mut tx = minted(&alice, 1);
        tx.metadata = Some(Default::default());
        assert!(validate_create_payload(&tx).is_err());
    }
}
