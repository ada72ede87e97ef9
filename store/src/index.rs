//! Secondary queries over transactions embedded in written blocks.

use crate::{unsupported, QueryIter, StoreBackend, StoreError};
use fedchain_types::{Asset, Operation, PublicKey, Transaction, TxId};

/// Asset, spend and ownership lookups.
///
/// Results are lazy and cover written blocks only, not the backlog. A
/// CREATE transaction belongs to the asset it mints.
pub trait TransactionIndex: StoreBackend {
    /// Ids of every transaction of asset `asset_id`.
    fn get_txids_by_asset_id(&self, asset_id: &TxId) -> Result<QueryIter<TxId>, StoreError> {
        let _ = asset_id;
        Err(unsupported(self, "get_txids_by_asset_id"))
    }

    /// The payload of the CREATE transaction(s) with id `asset_id`, with
    /// `Asset::id` set to that id.
    fn get_asset_by_id(&self, asset_id: &TxId) -> Result<QueryIter<Asset>, StoreError> {
        let _ = asset_id;
        Err(unsupported(self, "get_asset_by_id"))
    }

    /// Transactions with an input fulfilling `(tx_id, output_index)`.
    /// Empty means unspent.
    fn get_spent(
        &self,
        tx_id: &TxId,
        output_index: u32,
    ) -> Result<QueryIter<Transaction>, StoreError> {
        let _ = (tx_id, output_index);
        Err(unsupported(self, "get_spent"))
    }

    /// Transactions with an output addressed to `owner`.
    fn get_owned_ids(&self, owner: &PublicKey) -> Result<QueryIter<Transaction>, StoreError> {
        let _ = owner;
        Err(unsupported(self, "get_owned_ids"))
    }

    /// Ids matching every given filter; `None` leaves that axis unconstrained.
    fn get_transactions_list(
        &self,
        asset_id: Option<&TxId>,
        operation: Option<Operation>,
    ) -> Result<QueryIter<TxId>, StoreError> {
        let _ = (asset_id, operation);
        Err(unsupported(self, "get_transactions_list"))
    }
}

/// Filter predicate shared by backends for `get_transactions_list`.
pub fn matches_filters(tx: &Transaction, asset_id: Option<&TxId>, operation: Option<Operation>) -> bool {
    asset_id.map_or(true, |a| tx.asset_id().as_ref() == Some(a))
        && operation.map_or(true, |op| tx.operation == op)
}
