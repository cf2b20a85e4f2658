//! Issuance validation predicate
//!
//! A pure function over a proposed transaction. Every party runs the same
//! checks over the same bytes and must reach the same verdict, so nothing
//! here touches clocks, randomness, or shared state.

use crate::types::{CommandKind, ProposedTransaction};
use rust_decimal::Decimal;
use thiserror::Error;

/// Rejection reason for an invalid issuance transaction
///
/// Each variant maps to one check, in evaluation order. The `Display`
/// strings are stable; callers and counterparties assert on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Zero or more than one Issue command declared
    #[error("missing or ambiguous command")]
    MissingOrAmbiguousCommand,

    /// Issuance must not consume prior states
    #[error("no inputs should be consumed when issuing")]
    InputsNotEmpty,

    /// Issuance must create exactly one obligation
    #[error("exactly one output required")]
    WrongOutputCount,

    /// Obligation amount must be strictly positive
    #[error("amount must be positive")]
    NonPositiveAmount,

    /// A party cannot owe itself
    #[error("lender and borrower must differ")]
    LenderIsBorrower,

    /// Declared signers must equal the participant set exactly
    #[error("signers must be exactly lender and borrower")]
    WrongSignerSet,
}

/// Validate a proposed issuance transaction
///
/// Checks run in a fixed order and short-circuit on the first failure,
/// so a transaction violating several rules reports the earliest one.
pub fn validate(tx: &ProposedTransaction) -> Result<(), Rejection> {
    // 1. Exactly one Issue command
    let mut issue_commands = tx
        .commands
        .iter()
        .filter(|c| c.kind == CommandKind::Issue);
    let command = match (issue_commands.next(), issue_commands.next()) {
        (Some(command), None) => command,
        _ => return Err(Rejection::MissingOrAmbiguousCommand),
    };

    // 2. No consumed inputs
    if !tx.inputs.is_empty() {
        return Err(Rejection::InputsNotEmpty);
    }

    // 3. Exactly one obligation output
    let output = match tx.outputs.as_slice() {
        [output] => output,
        _ => return Err(Rejection::WrongOutputCount),
    };

    // 4. Positive amount
    if output.amount.quantity <= Decimal::ZERO {
        return Err(Rejection::NonPositiveAmount);
    }

    // 5. Distinct parties
    if output.lender == output.borrower {
        return Err(Rejection::LenderIsBorrower);
    }

    // 6. Exact signer set (strict equality, not containsAll)
    if command.signers != output.participants() {
        return Err(Rejection::WrongSignerSet);
    }

    Ok(())
}
