//! Error types for the ledger crate

use crate::types::PartyId;
use thiserror::Error;
use uuid::Uuid;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Expected signature is absent
    #[error("Missing signature from {0}")]
    MissingSignature(PartyId),

    /// Transaction not found in the vault
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
}
