//! Backlog entries: pending transactions plus assignment bookkeeping.

use serde::{Deserialize, Serialize};

use crate::{PublicKey, Timestamp, Transaction, TxId};

/// Which node is responsible for putting a pending transaction into a block,
/// and since when.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignee: PublicKey,
    pub assignment_timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub transaction: Transaction,
    pub assignment: Assignment,
}

impl BacklogEntry {
    pub fn id(&self) -> TxId {
        self.transaction.id
    }

    /// Whether the assignment is older than `now - delay_secs`.
    pub fn is_stale(&self, delay_secs: u64, now: Timestamp) -> bool {
        self.assignment.assignment_timestamp < now.minus_secs(delay_secs)
    }
}
