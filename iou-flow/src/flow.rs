//! Agreement protocol state machines
//!
//! One instance runs per party, per issuance. Each instance is a
//! sequential state machine; its only suspension points are session
//! send/receive and the notarization call. Every transition is explicit
//! and logged, and every terminal state other than `Finalized` carries a
//! specific reason.
//!
//! The initiator and responder both invoke the same named validator from
//! `iou_ledger::validation`, so identical transaction bytes produce
//! identical verdicts on every node.

use crate::node::PartyContext;
use crate::session::{Session, SessionMessage};
use crate::{FlowError, Result};
use chrono::Utc;
use iou_ledger::{
    validate, Command, CommittedTransaction, FinalizedTxRef, ObligationState, PartyId,
    ProposedTransaction, SignedTransaction,
};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Protocol instance state, used for observability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Assembling the proposed transaction
    Building,
    /// Proposal validated and signed locally
    Proposed,
    /// Awaiting counterparty endorsements
    CollectingSignatures,
    /// All signatures present; awaiting notarization
    ReadyToFinalize,
    /// Committed and distributed
    Finalized,
    /// Local validator refused the proposal
    Rejected(String),
    /// Remote rejection, transport failure, or notary conflict
    Aborted(String),
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Building => write!(f, "building"),
            FlowState::Proposed => write!(f, "proposed"),
            FlowState::CollectingSignatures => write!(f, "collecting-signatures"),
            FlowState::ReadyToFinalize => write!(f, "ready-to-finalize"),
            FlowState::Finalized => write!(f, "finalized"),
            FlowState::Rejected(reason) => write!(f, "rejected: {}", reason),
            FlowState::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Initiator path: build, validate, collect endorsements, finalize
pub(crate) async fn initiate(
    party: &PartyContext,
    obligation: ObligationState,
) -> Result<FinalizedTxRef> {
    // Building
    let participants = obligation.participants();
    let tx = ProposedTransaction {
        tx_id: Uuid::now_v7(),
        notary: party.directory.notary(),
        inputs: Vec::new(),
        outputs: vec![obligation],
        commands: vec![Command::issue(participants.clone())],
        created_at: Utc::now(),
    };
    let tx_id = tx.tx_id;
    tracing::debug!(
        party = %party.id,
        %tx_id,
        state = %FlowState::Building,
        "issuance proposal assembled"
    );

    // Proposed: an invalid proposal is never sent anywhere
    if let Err(rejection) = validate(&tx) {
        tracing::warn!(
            party = %party.id,
            %tx_id,
            state = %FlowState::Rejected(rejection.to_string()),
            "local validation refused the proposal"
        );
        return Err(FlowError::ValidationRejected(rejection));
    }

    let message = tx.canonical_bytes()?;
    let mut stx = SignedTransaction::new(tx);
    stx.add_signature(party.id.clone(), party.keys.sign(&message));
    tracing::debug!(
        party = %party.id,
        %tx_id,
        state = %FlowState::Proposed,
        "proposal validated and signed"
    );

    let mut sessions = Vec::new();
    match drive(party, &mut sessions, stx, &participants).await {
        Ok(reference) => {
            tracing::info!(
                party = %party.id,
                %tx_id,
                sequence = reference.sequence,
                state = %FlowState::Finalized,
                "issuance finalized"
            );
            Ok(reference)
        }
        Err(err) => {
            // No partial commit: tell every open session the instance is dead
            for session in &sessions {
                let _ = session
                    .send(SessionMessage::Rejection {
                        party: party.id.clone(),
                        reason: err.to_string(),
                    })
                    .await;
            }
            tracing::warn!(
                party = %party.id,
                %tx_id,
                state = %FlowState::Aborted(err.to_string()),
                "issuance aborted"
            );
            Err(err)
        }
    }
}

/// Collect endorsements from every counterparty, then finalize
///
/// Sessions are pushed into `sessions` as they open so the caller can
/// notify all of them if any step fails.
async fn drive(
    party: &PartyContext,
    sessions: &mut Vec<Session>,
    mut stx: SignedTransaction,
    participants: &BTreeSet<PartyId>,
) -> Result<FinalizedTxRef> {
    let tx_id = stx.tx.tx_id;

    // CollectingSignatures: one session per counterparty
    for peer in participants.iter().filter(|p| **p != party.id) {
        let session = party.hub.open(party.id.clone(), peer.clone()).await?;
        session.send(SessionMessage::Proposal(stx.clone())).await?;
        sessions.push(session);
    }
    tracing::debug!(
        party = %party.id,
        %tx_id,
        state = %FlowState::CollectingSignatures,
        counterparties = sessions.len(),
        "proposal sent"
    );

    // Every counterparty must answer; partial signature sets are never
    // handed to the notary
    for session in sessions.iter_mut() {
        let peer = session.peer().clone();
        match session.receive().await? {
            SessionMessage::Countersignature {
                party: signer,
                signature,
            } => {
                if signer != peer {
                    return Err(FlowError::SessionFailure {
                        party: peer,
                        reason: format!("countersignature claims to be from {}", signer),
                    });
                }
                let key = party.directory.resolve(&signer)?;
                stx.add_signature(signer.clone(), signature);
                stx.verify_signature_of(&signer, &key)?;
            }
            SessionMessage::Rejection {
                party: rejecting,
                reason,
            } => {
                return Err(FlowError::CounterpartyRejected {
                    party: rejecting,
                    reason,
                });
            }
            other => {
                return Err(FlowError::SessionFailure {
                    party: peer,
                    reason: format!("expected countersignature, got {}", other.kind()),
                });
            }
        }
    }

    debug_assert!(stx.is_fully_signed(participants));
    tracing::debug!(
        party = %party.id,
        %tx_id,
        state = %FlowState::ReadyToFinalize,
        "all signatures collected"
    );

    // Finalization: the notary is the sole serialization point
    let sequence = party.notary.notarize(&stx).await?;
    let committed = CommittedTransaction { stx, sequence };
    let reference = party.vault.record(committed.clone());

    for session in sessions.iter() {
        session
            .send(SessionMessage::Finalized(committed.clone()))
            .await?;
    }

    Ok(reference)
}

/// Responder path: validate independently, countersign, adopt the result
pub(crate) async fn respond(party: &PartyContext, session: &mut Session) -> Result<FinalizedTxRef> {
    let initiator = session.peer().clone();
    let stx = match session.receive().await? {
        SessionMessage::Proposal(stx) => stx,
        other => {
            return Err(FlowError::SessionFailure {
                party: initiator,
                reason: format!("expected proposal, got {}", other.kind()),
            });
        }
    };
    let tx_id = stx.tx.tx_id;
    tracing::debug!(
        party = %party.id,
        %tx_id,
        initiator = %initiator,
        "proposal received"
    );

    // Independent run of the same validator the initiator used
    if let Err(rejection) = validate(&stx.tx) {
        session
            .send(SessionMessage::Rejection {
                party: party.id.clone(),
                reason: rejection.to_string(),
            })
            .await?;
        tracing::warn!(
            party = %party.id,
            %tx_id,
            state = %FlowState::Rejected(rejection.to_string()),
            "proposal refused"
        );
        return Err(FlowError::ValidationRejected(rejection));
    }

    // Sign only transactions that declare us as a signer
    let declared = stx
        .tx
        .commands
        .iter()
        .any(|command| command.signers.contains(&party.id));
    if !declared {
        let reason = format!("{} is not a declared signer", party.id);
        session
            .send(SessionMessage::Rejection {
                party: party.id.clone(),
                reason: reason.clone(),
            })
            .await?;
        return Err(FlowError::SessionFailure {
            party: initiator,
            reason,
        });
    }

    // The initiator must already stand behind the proposal
    let initiator_key = party.directory.resolve(&initiator)?;
    if let Err(err) = stx.verify_signature_of(&initiator, &initiator_key) {
        session
            .send(SessionMessage::Rejection {
                party: party.id.clone(),
                reason: err.to_string(),
            })
            .await?;
        return Err(err.into());
    }

    let message = stx.tx.canonical_bytes()?;
    session
        .send(SessionMessage::Countersignature {
            party: party.id.clone(),
            signature: party.keys.sign(&message),
        })
        .await?;
    tracing::debug!(party = %party.id, %tx_id, "proposal countersigned");

    // Await the notarized result on the same session; responders never
    // invoke finalization themselves
    match session.receive().await? {
        SessionMessage::Finalized(committed) => {
            adopt(party, &initiator, tx_id, committed)
        }
        SessionMessage::Rejection {
            party: rejecting,
            reason,
        } => {
            tracing::warn!(
                party = %party.id,
                %tx_id,
                state = %FlowState::Aborted(reason.clone()),
                "initiator aborted the instance"
            );
            Err(FlowError::CounterpartyRejected {
                party: rejecting,
                reason,
            })
        }
        other => Err(FlowError::SessionFailure {
            party: initiator,
            reason: format!("expected finalized transaction, got {}", other.kind()),
        }),
    }
}

/// Verify and record a notarized transaction delivered by the initiator
fn adopt(
    party: &PartyContext,
    initiator: &PartyId,
    expected_tx_id: Uuid,
    committed: CommittedTransaction,
) -> Result<FinalizedTxRef> {
    if committed.stx.tx.tx_id != expected_tx_id {
        return Err(FlowError::SessionFailure {
            party: initiator.clone(),
            reason: "finalized transaction does not match the proposal".to_string(),
        });
    }

    // Adopt only a fact every declared signer stands behind
    let required: BTreeSet<PartyId> = committed
        .stx
        .tx
        .commands
        .iter()
        .flat_map(|command| command.signers.iter().cloned())
        .collect();
    if !committed.stx.is_fully_signed(&required) {
        return Err(FlowError::SessionFailure {
            party: initiator.clone(),
            reason: "finalized transaction is not fully signed".to_string(),
        });
    }
    for signer in &required {
        let key = party.directory.resolve(signer)?;
        committed.stx.verify_signature_of(signer, &key)?;
    }

    let reference = party.vault.record(committed);
    tracing::info!(
        party = %party.id,
        tx_id = %expected_tx_id,
        sequence = reference.sequence,
        state = %FlowState::Finalized,
        "committed transaction adopted"
    );
    Ok(reference)
}
