//! Per-party store of committed ledger facts
//!
//! Each party keeps its own vault of notarized transactions. The vault is
//! the read-only view other protocol instances see; it never holds
//! proposals that have not been sequenced by the notary.

use crate::types::{CommittedTransaction, FinalizedTxRef, ObligationState, PartyId};
use crate::{Error, Result};
use dashmap::DashMap;
use uuid::Uuid;

/// Committed-fact store for one party
#[derive(Debug, Default)]
pub struct Vault {
    committed: DashMap<Uuid, CommittedTransaction>,
}

impl Vault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed transaction
    ///
    /// Idempotent by transaction ID: recording the same finalized
    /// transaction twice keeps the first copy.
    pub fn record(&self, committed: CommittedTransaction) -> FinalizedTxRef {
        let reference = committed.reference();
        self.committed
            .entry(committed.stx.tx.tx_id)
            .or_insert(committed);
        reference
    }

    /// Look up a committed transaction by ID
    pub fn get(&self, tx_id: Uuid) -> Result<CommittedTransaction> {
        self.committed
            .get(&tx_id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::TransactionNotFound(tx_id))
    }

    /// All committed obligations this party participates in
    pub fn obligations_for(&self, party: &PartyId) -> Vec<ObligationState> {
        self.committed
            .iter()
            .flat_map(|entry| entry.value().stx.tx.outputs.clone())
            .filter(|state| state.participants().contains(party))
            .collect()
    }

    /// Number of committed transactions
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// True if nothing has been committed yet
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
