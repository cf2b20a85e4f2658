//! Error taxonomy for the agreement protocol
//!
//! Every terminal non-finalized outcome carries its specific, inspectable
//! reason. Nothing here is retried silently inside a protocol instance;
//! retry policy belongs to the caller, and only for transport failures.

use iou_ledger::{PartyId, Rejection};
use thiserror::Error;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Agreement protocol errors
#[derive(Error, Debug)]
pub enum FlowError {
    /// Deterministic business-rule violation from the local validator.
    /// Never retried; the reason is surfaced verbatim to the caller.
    #[error("validation rejected: {0}")]
    ValidationRejected(Rejection),

    /// A remote validator disagreed; the whole instance aborts
    #[error("counterparty {party} rejected: {reason}")]
    CounterpartyRejected {
        /// Rejecting party
        party: PartyId,
        /// Reason reported by the remote validator
        reason: String,
    },

    /// Transport-level failure (closed session, timeout). The caller may
    /// retry with a fresh instance.
    #[error("session with {party} failed: {reason}")]
    SessionFailure {
        /// Peer on the failed session
        party: PartyId,
        /// Transport failure detail
        reason: String,
    },

    /// Consistency violation reported by the notarization service.
    /// Distinct from validation failure: ledger state assumptions were
    /// stale, not a business rule.
    #[error("notary conflict: {0}")]
    NotaryConflict(String),

    /// No verifying key registered for a party
    #[error("unknown party: {0}")]
    UnknownParty(PartyId),

    /// Signing or serialization fault from the ledger layer
    #[error("ledger error: {0}")]
    Ledger(#[from] iou_ledger::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
