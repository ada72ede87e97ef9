//! Structural validation of untrusted transaction JSON.
//!
//! Runs before any hashing or signature work. Unknown fields, wrong types,
//! a bad version, empty input/output lists, an empty metadata object and
//! operation/asset mismatches are all rejected here.

use fedchain_types::{Operation, Transaction, TX_VERSION};
use serde_json::Value;

use crate::TransactionError;

fn schema_err(msg: impl Into<String>) -> TransactionError {
    TransactionError::SchemaValidation(msg.into())
}

/// Parse `value` into a [`Transaction`], enforcing the wire schema.
///
/// GENESIS transactions are never accepted from clients.
pub fn validate_transaction_schema(value: &Value) -> Result<Transaction, TransactionError> {
    if !value.is_object() {
        return Err(schema_err("transaction must be a JSON object"));
    }
    let tx: Transaction =
        serde_json::from_value(value.clone()).map_err(|e| schema_err(e.to_string()))?;
    check_structure(&tx)?;
    Ok(tx)
}

fn check_structure(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.version != TX_VERSION {
        return Err(schema_err(format!(
            "unsupported version '{}', expected '{}'",
            tx.version, TX_VERSION
        )));
    }
    if tx.operation == Operation::Genesis {
        return Err(schema_err("GENESIS transactions cannot be submitted"));
    }
    if tx.inputs.is_empty() {
        return Err(schema_err("inputs must not be empty"));
    }
    if tx.outputs.is_empty() {
        return Err(schema_err("outputs must not be empty"));
    }
    if tx.metadata.as_ref().is_some_and(|m| m.is_empty()) {
        return Err(schema_err("metadata must not be an empty object"));
    }

    for (i, input) in tx.inputs.iter().enumerate() {
        if input.owners_before.is_empty() {
            return Err(schema_err(format!("input {i}: owners_before must not be empty")));
        }
        match (tx.operation, &input.fulfills) {
            (Operation::Create, Some(_)) => {
                return Err(schema_err(format!("input {i}: CREATE inputs cannot fulfill outputs")))
            }
            (Operation::Transfer, None) => {
                return Err(schema_err(format!("input {i}: TRANSFER inputs must fulfill an output")))
            }
            _ => {}
        }
    }

    for (i, output) in tx.outputs.iter().enumerate() {
        let keys = output.public_keys.len() as u32;
        if keys == 0 {
            return Err(schema_err(format!("output {i}: public_keys must not be empty")));
        }
        if output.condition.threshold == 0 || output.condition.threshold > keys {
            return Err(schema_err(format!(
                "output {i}: threshold {} out of range 1..={keys}",
                output.condition.threshold
            )));
        }
    }

    match tx.operation {
        Operation::Create if tx.asset.id.is_some() => {
            Err(schema_err("CREATE asset must not carry an id"))
        }
        Operation::Transfer if tx.asset.id.is_none() => {
            Err(schema_err("TRANSFER asset must carry an id"))
        }
        Operation::Transfer if tx.asset.data.is_some() => {
            Err(schema_err("TRANSFER asset must not carry data"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create, OutputSpec};
    use fedchain_types::PublicKey;
    use serde_json::json;

    fn valid_create() -> Value {
        let pk = PublicKey([7; 32]);
        let tx = create(vec![pk], vec![OutputSpec::new(vec![pk], 1)], None, None).unwrap();
        serde_json::to_value(tx).unwrap()
    }

    #[test]
    fn accepts_builder_output() {
        assert!(validate_transaction_schema(&valid_create()).is_ok());
    }

    #[test]
    fn rejects_non_object() {
        let err = validate_transaction_schema(&json!([1, 2])).unwrap_err();
        assert_eq!(err.name(), "SchemaValidationError");
    }

    #[test]
    fn rejects_empty_metadata() {
        let mut v = valid_create();
        v["metadata"] = json!({});
        assert!(matches!(
            validate_transaction_schema(&v),
            Err(TransactionError::SchemaValidation(_))
        ));
    }

    #[test]
    fn rejects_unknown_field() {
        let mut v = valid_create();
        v["extra"] = json!(true);
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut v = valid_create();
        v["version"] = json!("2.0");
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_unknown_operation() {
        let mut v = valid_create();
        v["operation"] = json!("create");
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_genesis() {
        let mut v = valid_create();
        v["operation"] = json!("GENESIS");
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_empty_outputs() {
        let mut v = valid_create();
        v["outputs"] = json!([]);
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_threshold_above_key_count() {
        let mut v = valid_create();
        v["outputs"][0]["condition"]["threshold"] = json!(2);
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_create_with_asset_id() {
        let mut v = valid_create();
        v["asset"] = json!({ "id": "00".repeat(32) });
        assert!(validate_transaction_schema(&v).is_err());
    }

    #[test]
    fn rejects_malformed_public_key() {
        let mut v = valid_create();
        v["outputs"][0]["public_keys"][0] = json!("not-base58-0OIl");
        assert!(validate_transaction_schema(&v).is_err());
    }
}
