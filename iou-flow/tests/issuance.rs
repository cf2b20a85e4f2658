//! End-to-end tests for the issuance agreement protocol
//!
//! Drives real parties over the in-memory transport and notary:
//! - Happy path: both participants adopt the same committed fact
//! - Invalid proposals die locally, before any session or notary call
//! - Notary conflicts and silent counterparties abort the instance
//! - Responders reach the same verdict as the initiator (determinism)

use std::sync::Arc;
use std::time::Duration;

use iou_flow::{
    Directory, FlowConfig, FlowError, NotaryService, Party, SessionHub, SessionMessage,
};
use iou_ledger::{
    crypto::KeyPair, validate, Amount, Command, Currency, ObligationState, PartyId,
    ProposedTransaction, Rejection, SignedTransaction,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

struct TestNet {
    hub: Arc<SessionHub>,
    notary: Arc<NotaryService>,
    directory: Arc<Directory>,
}

impl TestNet {
    fn new() -> Self {
        Self::with_config(FlowConfig {
            session_timeout_ms: 500,
            session_buffer: 8,
        })
    }

    fn with_config(config: FlowConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let notary = Arc::new(NotaryService::new(PartyId::new("notary")));
        let directory = Arc::new(Directory::new(notary.identity()));
        let hub = Arc::new(SessionHub::new(config));
        Self {
            hub,
            notary,
            directory,
        }
    }

    fn party(&self, name: &str) -> Party {
        Party::spawn(
            PartyId::new(name),
            self.hub.clone(),
            self.notary.clone(),
            self.directory.clone(),
        )
    }
}

fn usd(quantity: Decimal) -> Amount {
    Amount::new(quantity, Currency::USD)
}

fn obligation(lender: &Party, borrower: &Party, quantity: Decimal) -> ObligationState {
    ObligationState::new(lender.id().clone(), borrower.id().clone(), usd(quantity))
}

/// Responder vault writes happen after the initiator returns; give the
/// spawned task a moment to adopt the fact.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_issue_reaches_finalized_on_both_parties() {
    let net = TestNet::new();
    let alice = net.party("alice");
    let bob = net.party("bob");

    let reference = alice
        .issue(obligation(&alice, &bob, dec!(100.00)))
        .await
        .unwrap();
    settle().await;

    // The notary assigned a sequence position
    assert!(reference.sequence >= 1);
    assert_eq!(net.notary.request_count(), 1);

    // Both instances observe the same finalized output
    let on_alice = alice.vault().get(reference.tx_id).unwrap();
    let on_bob = bob.vault().get(reference.tx_id).unwrap();
    assert_eq!(on_alice, on_bob);
    assert_eq!(on_alice.sequence, reference.sequence);

    let outputs = &on_bob.stx.tx.outputs;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].amount, usd(dec!(100.00)));
    assert_eq!(&outputs[0].lender, alice.id());
    assert_eq!(&outputs[0].borrower, bob.id());

    // Committed fact is queryable from either side
    assert_eq!(alice.vault().obligations_for(bob.id()).len(), 1);
    assert_eq!(bob.vault().obligations_for(alice.id()).len(), 1);
}

#[tokio::test]
async fn test_zero_amount_rejected_before_any_session() {
    let net = TestNet::new();
    let alice = net.party("alice");
    let bob = net.party("bob");

    let err = alice
        .issue(obligation(&alice, &bob, dec!(0)))
        .await
        .unwrap_err();

    match err {
        FlowError::ValidationRejected(rejection) => {
            assert_eq!(rejection, Rejection::NonPositiveAmount);
            assert_eq!(rejection.to_string(), "amount must be positive");
        }
        other => panic!("expected validation rejection, got {:?}", other),
    }

    // Rejected at Proposed: no session opened, no notary call
    assert_eq!(net.hub.opened_sessions(), 0);
    assert_eq!(net.notary.request_count(), 0);
    assert!(alice.vault().is_empty());
    assert!(bob.vault().is_empty());
}

#[tokio::test]
async fn test_self_issuance_rejected_locally() {
    let net = TestNet::new();
    let alice = net.party("alice");

    let err = alice
        .issue(obligation(&alice, &alice, dec!(50.00)))
        .await
        .unwrap_err();

    match err {
        FlowError::ValidationRejected(rejection) => {
            assert_eq!(rejection, Rejection::LenderIsBorrower);
        }
        other => panic!("expected validation rejection, got {:?}", other),
    }
    assert_eq!(net.hub.opened_sessions(), 0);
}

#[tokio::test]
async fn test_notary_conflict_aborts_instance() {
    let net = TestNet::new();
    let alice = net.party("alice");
    let bob = net.party("bob");

    net.notary.halt("conflicting prior consumption");

    let err = alice
        .issue(obligation(&alice, &bob, dec!(100.00)))
        .await
        .unwrap_err();
    settle().await;

    match err {
        FlowError::NotaryConflict(reason) => assert!(reason.contains("halted")),
        other => panic!("expected notary conflict, got {:?}", other),
    }

    // Aborted for all: nothing was committed anywhere
    assert!(alice.vault().is_empty());
    assert!(bob.vault().is_empty());

    // A fresh instance succeeds once the conflict clears
    net.notary.resume();
    let reference = alice
        .issue(obligation(&alice, &bob, dec!(100.00)))
        .await
        .unwrap();
    settle().await;
    assert!(bob.vault().get(reference.tx_id).is_ok());
}

#[tokio::test]
async fn test_counterparty_rejection_aborts_initiator() {
    let net = TestNet::new();
    let alice = net.party("alice");

    // A counterparty that answers every proposal with a refusal
    let grudge = PartyId::new("grudge");
    let grudge_keys = KeyPair::generate();
    net.directory.register(grudge.clone(), grudge_keys.public_key());
    let mut grudge_inbox = net.hub.register(grudge.clone());
    let rejecting = grudge.clone();
    tokio::spawn(async move {
        while let Some(mut session) = grudge_inbox.recv().await {
            if let Ok(SessionMessage::Proposal(_)) = session.receive().await {
                let _ = session
                    .send(SessionMessage::Rejection {
                        party: rejecting.clone(),
                        reason: "obligation declined by policy".to_string(),
                    })
                    .await;
            }
        }
    });

    let state = ObligationState::new(alice.id().clone(), grudge.clone(), usd(dec!(100.00)));
    let err = alice.issue(state).await.unwrap_err();

    // The remote refusal surfaces verbatim and aborts the whole instance
    match err {
        FlowError::CounterpartyRejected { party, reason } => {
            assert_eq!(party, grudge);
            assert_eq!(reason, "obligation declined by policy");
        }
        other => panic!("expected counterparty rejection, got {:?}", other),
    }
    assert_eq!(net.notary.request_count(), 0);
    assert!(alice.vault().is_empty());
}

#[tokio::test]
async fn test_unreachable_counterparty_aborts() {
    let net = TestNet::with_config(FlowConfig {
        session_timeout_ms: 200,
        session_buffer: 8,
    });
    let alice = net.party("alice");

    // Registered with transport and directory, but never answers
    let silent = PartyId::new("silent");
    let _silent_inbox = net.hub.register(silent.clone());
    net.directory
        .register(silent.clone(), KeyPair::generate().public_key());

    let state = ObligationState::new(alice.id().clone(), silent.clone(), usd(dec!(25.00)));
    let err = alice.issue(state).await.unwrap_err();

    match err {
        FlowError::SessionFailure { party, reason } => {
            assert_eq!(party, silent);
            assert!(reason.contains("timed out"));
        }
        other => panic!("expected session failure, got {:?}", other),
    }
    assert_eq!(net.notary.request_count(), 0);
    assert!(alice.vault().is_empty());
}

#[tokio::test]
async fn test_unregistered_counterparty_fails_fast() {
    let net = TestNet::new();
    let alice = net.party("alice");

    let state = ObligationState::new(
        alice.id().clone(),
        PartyId::new("nowhere"),
        usd(dec!(25.00)),
    );
    let err = alice.issue(state).await.unwrap_err();

    assert!(matches!(err, FlowError::SessionFailure { .. }));
    assert_eq!(net.notary.request_count(), 0);
}

#[tokio::test]
async fn test_responder_rejects_invalid_proposal_with_specific_reason() {
    let net = TestNet::new();
    let bob = net.party("bob");

    // A peer that skips local validation and pushes an invalid proposal
    let mallory = PartyId::new("mallory");
    let mallory_keys = KeyPair::generate();
    net.directory.register(mallory.clone(), mallory_keys.public_key());

    let state = ObligationState::new(mallory.clone(), bob.id().clone(), usd(dec!(0)));
    let tx = ProposedTransaction {
        tx_id: Uuid::now_v7(),
        notary: net.directory.notary(),
        inputs: vec![],
        outputs: vec![state.clone()],
        commands: vec![Command::issue(state.participants())],
        created_at: chrono::Utc::now(),
    };
    let message = tx.canonical_bytes().unwrap();
    let mut stx = SignedTransaction::new(tx);
    stx.add_signature(mallory.clone(), mallory_keys.sign(&message));

    let mut session = net
        .hub
        .open(mallory.clone(), bob.id().clone())
        .await
        .unwrap();
    session
        .send(SessionMessage::Proposal(stx))
        .await
        .unwrap();

    // Bob's own validator run refuses with the exact reason
    match session.receive().await.unwrap() {
        SessionMessage::Rejection { party, reason } => {
            assert_eq!(&party, bob.id());
            assert_eq!(reason, "amount must be positive");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(net.notary.request_count(), 0);
    assert!(bob.vault().is_empty());
}

#[tokio::test]
async fn test_responders_agree_with_each_other_and_the_validator() {
    let net = TestNet::new();
    let bob = net.party("bob");
    let carol = net.party("carol");

    let mallory = PartyId::new("mallory");
    let mallory_keys = KeyPair::generate();
    net.directory.register(mallory.clone(), mallory_keys.public_key());

    // Same invalid transaction bytes to two independent responders
    let state = ObligationState::new(mallory.clone(), mallory.clone(), usd(dec!(10.00)));
    let mut signers = state.participants();
    signers.insert(bob.id().clone());
    signers.insert(carol.id().clone());
    let tx = ProposedTransaction {
        tx_id: Uuid::now_v7(),
        notary: net.directory.notary(),
        inputs: vec![],
        outputs: vec![state],
        commands: vec![Command::issue(signers)],
        created_at: chrono::Utc::now(),
    };
    let local_verdict = validate(&tx).unwrap_err();

    let message = tx.canonical_bytes().unwrap();
    let mut stx = SignedTransaction::new(tx);
    stx.add_signature(mallory.clone(), mallory_keys.sign(&message));

    let mut reasons = Vec::new();
    for responder in [bob.id().clone(), carol.id().clone()] {
        let mut session = net.hub.open(mallory.clone(), responder).await.unwrap();
        session
            .send(SessionMessage::Proposal(stx.clone()))
            .await
            .unwrap();
        match session.receive().await.unwrap() {
            SessionMessage::Rejection { reason, .. } => reasons.push(reason),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    // Identical input, identical verdict, identical reason everywhere
    assert_eq!(reasons[0], reasons[1]);
    assert_eq!(reasons[0], local_verdict.to_string());
}

#[tokio::test]
async fn test_concurrent_issuances_by_same_party() {
    let net = TestNet::new();
    let alice = net.party("alice");
    let bob = net.party("bob");
    let carol = net.party("carol");

    let (first, second) = tokio::join!(
        alice.issue(obligation(&alice, &bob, dec!(100.00))),
        alice.issue(obligation(&alice, &carol, dec!(250.00))),
    );
    settle().await;

    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.tx_id, second.tx_id);
    assert_ne!(first.sequence, second.sequence);

    assert_eq!(alice.vault().len(), 2);
    assert!(bob.vault().get(first.tx_id).is_ok());
    assert!(carol.vault().get(second.tx_id).is_ok());
}

#[tokio::test]
async fn test_borrower_can_initiate_too() {
    let net = TestNet::new();
    let alice = net.party("alice");
    let bob = net.party("bob");

    // Bob proposes his own debt; alice countersigns
    let state = ObligationState::new(alice.id().clone(), bob.id().clone(), usd(dec!(42.00)));
    let reference = bob.issue(state).await.unwrap();
    settle().await;

    assert!(alice.vault().get(reference.tx_id).is_ok());
    assert!(bob.vault().get(reference.tx_id).is_ok());
}
