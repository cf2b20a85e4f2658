//! Notarization service
//!
//! The sole serialization point of the system: guarantees no consumed
//! input is reused across committed transactions and assigns each
//! notarized transaction a unique, monotonically increasing sequence
//! position. Idempotent per transaction ID, so a retried call for an
//! already-sequenced transaction returns the original position instead
//! of double-committing.

use crate::{FlowError, Result};
use dashmap::DashMap;
use iou_ledger::{PartyId, SignedTransaction, StateRef};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// In-memory notarization service
#[derive(Debug)]
pub struct NotaryService {
    identity: PartyId,
    consumed: DashMap<StateRef, Uuid>,
    sequenced: DashMap<Uuid, u64>,
    next_sequence: AtomicU64,
    requests: AtomicU64,
    halted: RwLock<Option<String>>,
}

impl NotaryService {
    /// Create a notary with the given identity
    pub fn new(identity: PartyId) -> Self {
        Self {
            identity,
            consumed: DashMap::new(),
            sequenced: DashMap::new(),
            next_sequence: AtomicU64::new(1),
            requests: AtomicU64::new(0),
            halted: RwLock::new(None),
        }
    }

    /// This notary's identity
    pub fn identity(&self) -> PartyId {
        self.identity.clone()
    }

    /// Sequence a fully-signed transaction
    ///
    /// Rejects with [`FlowError::NotaryConflict`] when the transaction is
    /// not covered by its declared signer set, when any input was already
    /// consumed by a different transaction, or while the service is
    /// halted by its operator.
    pub async fn notarize(&self, stx: &SignedTransaction) -> Result<u64> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let tx_id = stx.tx.tx_id;

        // Idempotency: a known transaction keeps its original position
        if let Some(sequence) = self.sequenced.get(&tx_id) {
            tracing::debug!(%tx_id, sequence = *sequence, "already sequenced");
            return Ok(*sequence);
        }

        if let Some(reason) = self.halted.read().as_deref() {
            return Err(FlowError::NotaryConflict(format!(
                "service halted: {}",
                reason
            )));
        }

        // The declared signer set must be fully covered before sequencing
        let required: BTreeSet<PartyId> = stx
            .tx
            .commands
            .iter()
            .flat_map(|command| command.signers.iter().cloned())
            .collect();
        if !stx.is_fully_signed(&required) {
            return Err(FlowError::NotaryConflict(format!(
                "transaction {} is not signed by its declared signer set",
                tx_id
            )));
        }

        // No input may be consumed twice across committed transactions
        for input in &stx.tx.inputs {
            let entry = self.consumed.entry(input.clone()).or_insert(tx_id);
            if *entry.value() != tx_id {
                return Err(FlowError::NotaryConflict(format!(
                    "input {}#{} already consumed by {}",
                    input.tx_id,
                    input.output_index,
                    entry.value()
                )));
            }
        }

        // Entry API so two racing calls for the same transaction agree
        // on one position instead of the later overwriting the earlier
        let sequence = *self
            .sequenced
            .entry(tx_id)
            .or_insert_with(|| self.next_sequence.fetch_add(1, Ordering::SeqCst));
        tracing::info!(%tx_id, sequence, "transaction sequenced");
        Ok(sequence)
    }

    /// Operator hold: reject every new request until [`resume`](Self::resume)
    pub fn halt(&self, reason: impl Into<String>) {
        *self.halted.write() = Some(reason.into());
    }

    /// Lift an operator hold
    pub fn resume(&self) {
        *self.halted.write() = None;
    }

    /// Number of notarization requests received (retries included)
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
