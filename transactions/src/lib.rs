//! Transaction construction and the stateless half of admission.
//!
//! - **Builders**: CREATE, TRANSFER and GENESIS transactions, plus signing.
//! - **Content addressing**: the id is the Blake2b hash of the body with
//!   every fulfillment stripped.
//! - **Schema**: structural validation of untrusted JSON.
//! - **Validation**: id, signature, amount and payload checks that need no
//!   ledger state. Stateful checks (spent outputs, ownership, conservation)
//!   live in `fedchain-ledger`.

pub mod builder;
pub mod error;
pub mod id;
pub mod schema;
pub mod validation;

pub use builder::{create, genesis, sign_transaction, to_inputs, transfer, OutputSpec};
pub use error::TransactionError;
pub use id::{compute_id, signing_message};
pub use schema::validate_transaction_schema;
pub use validation::{
    validate_amounts, validate_create_payload, validate_id, validate_signatures, MAX_AMOUNT,
};
