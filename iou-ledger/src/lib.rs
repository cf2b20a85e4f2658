//! IOU Ledger Core
//!
//! Data model, cryptography, and the issuance validation predicate for a
//! shared, permissioned IOU ledger.
//!
//! # Architecture
//!
//! - **Deterministic validation**: a pure predicate over a proposed
//!   transaction; every party reaches the same verdict on the same bytes
//! - **Canonical serialization**: bincode over ordered collections, so
//!   signatures cover identical bytes on every node
//! - **Committed facts**: only notarized transactions enter a vault
//!
//! # Invariants
//!
//! - An obligation's amount is strictly positive
//! - Lender and borrower are distinct identities
//! - Declared signers equal the participant set exactly
//! - Issuance consumes no inputs and creates exactly one output

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod crypto;
pub mod error;
pub mod types;
pub mod validation;
pub mod vault;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Amount, Command, CommandKind, CommittedTransaction, Currency, FinalizedTxRef,
    ObligationState, PartyId, ProposedTransaction, Signature, SignedTransaction, StateRef,
};
pub use validation::{validate, Rejection};
pub use vault::Vault;
