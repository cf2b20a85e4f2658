//! In-memory session transport
//!
//! A session is a private, ordered, bidirectional channel between two
//! protocol participants, held for the duration of one protocol instance.
//! The hub pairs two `mpsc` channels per session and hands the far end to
//! the peer's inbound stream; FIFO delivery within a session comes from
//! the channel itself. Nothing is ordered across sessions.

use crate::{FlowConfig, FlowError, Result};
use iou_ledger::{CommittedTransaction, PartyId, Signature, SignedTransaction};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Payload exchanged over a session
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Initiator's partially-signed proposal
    Proposal(SignedTransaction),

    /// Responder's endorsement of the proposal
    Countersignature {
        /// Signing party
        party: PartyId,
        /// Signature over the proposal's canonical bytes
        signature: Signature,
    },

    /// A party refuses the proposal; the whole instance aborts
    Rejection {
        /// Rejecting party
        party: PartyId,
        /// Specific reason, surfaced verbatim
        reason: String,
    },

    /// Notarized result, distributed by the initiator
    Finalized(CommittedTransaction),
}

impl SessionMessage {
    /// Short tag for logs and error reasons
    pub fn kind(&self) -> &'static str {
        match self {
            SessionMessage::Proposal(_) => "proposal",
            SessionMessage::Countersignature { .. } => "countersignature",
            SessionMessage::Rejection { .. } => "rejection",
            SessionMessage::Finalized(_) => "finalized",
        }
    }
}

/// One end of an open session
#[derive(Debug)]
pub struct Session {
    peer: PartyId,
    outbound: mpsc::Sender<SessionMessage>,
    inbound: mpsc::Receiver<SessionMessage>,
    receive_timeout: std::time::Duration,
}

impl Session {
    /// The party at the other end
    pub fn peer(&self) -> &PartyId {
        &self.peer
    }

    /// Send a message to the peer
    pub async fn send(&self, message: SessionMessage) -> Result<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| FlowError::SessionFailure {
                party: self.peer.clone(),
                reason: "session closed by peer".to_string(),
            })
    }

    /// Receive the next message from the peer
    ///
    /// Applies the configured timeout; expiry or a closed channel maps to
    /// [`FlowError::SessionFailure`] and the instance aborts.
    pub async fn receive(&mut self) -> Result<SessionMessage> {
        match timeout(self.receive_timeout, self.inbound.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(FlowError::SessionFailure {
                party: self.peer.clone(),
                reason: "session closed by peer".to_string(),
            }),
            Err(_) => Err(FlowError::SessionFailure {
                party: self.peer.clone(),
                reason: format!("timed out after {:?}", self.receive_timeout),
            }),
        }
    }
}

/// Registry pairing sessions between parties
///
/// Stands in for the network transport: parties register an inbound
/// stream once, and any party can then open a session to any registered
/// peer.
#[derive(Debug)]
pub struct SessionHub {
    config: FlowConfig,
    inboxes: DashMap<PartyId, mpsc::Sender<Session>>,
    opened: AtomicU64,
}

impl SessionHub {
    /// Create a hub with the given protocol configuration
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            inboxes: DashMap::new(),
            opened: AtomicU64::new(0),
        }
    }

    /// Register a party; inbound sessions arrive on the returned stream
    pub fn register(&self, party: PartyId) -> mpsc::Receiver<Session> {
        let (tx, rx) = mpsc::channel(self.config.session_buffer);
        self.inboxes.insert(party, tx);
        rx
    }

    /// Open a session from `local` to `peer`
    ///
    /// Delivers the far end to the peer's inbound stream. Fails with
    /// [`FlowError::SessionFailure`] if the peer is not registered or no
    /// longer accepting sessions.
    pub async fn open(&self, local: PartyId, peer: PartyId) -> Result<Session> {
        let inbox = self
            .inboxes
            .get(&peer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlowError::SessionFailure {
                party: peer.clone(),
                reason: "party not registered with transport".to_string(),
            })?;

        let (to_peer, from_local) = mpsc::channel(self.config.session_buffer);
        let (to_local, from_peer) = mpsc::channel(self.config.session_buffer);

        let near = Session {
            peer: peer.clone(),
            outbound: to_peer,
            inbound: from_peer,
            receive_timeout: self.config.session_timeout(),
        };
        let far = Session {
            peer: local,
            outbound: to_local,
            inbound: from_local,
            receive_timeout: self.config.session_timeout(),
        };

        inbox
            .send(far)
            .await
            .map_err(|_| FlowError::SessionFailure {
                party: peer.clone(),
                reason: "party stopped accepting sessions".to_string(),
            })?;

        self.opened.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(peer = %peer, "session opened");
        Ok(near)
    }

    /// Number of sessions opened through this hub
    pub fn opened_sessions(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> SessionHub {
        SessionHub::new(FlowConfig {
            session_timeout_ms: 100,
            session_buffer: 4,
        })
    }

    #[tokio::test]
    async fn test_open_unregistered_party_fails() {
        let hub = hub();
        let result = hub
            .open(PartyId::new("alice"), PartyId::new("nobody"))
            .await;

        assert!(matches!(
            result,
            Err(FlowError::SessionFailure { .. })
        ));
        assert_eq!(hub.opened_sessions(), 0);
    }

    #[tokio::test]
    async fn test_messages_delivered_in_order() {
        let hub = hub();
        let mut bob_inbox = hub.register(PartyId::new("bob"));

        let alice_end = hub
            .open(PartyId::new("alice"), PartyId::new("bob"))
            .await
            .unwrap();

        for i in 0..3u64 {
            alice_end
                .send(SessionMessage::Rejection {
                    party: PartyId::new("alice"),
                    reason: format!("message {}", i),
                })
                .await
                .unwrap();
        }

        let mut bob_end = bob_inbox.recv().await.unwrap();
        assert_eq!(bob_end.peer(), &PartyId::new("alice"));

        for i in 0..3u64 {
            match bob_end.receive().await.unwrap() {
                SessionMessage::Rejection { reason, .. } => {
                    assert_eq!(reason, format!("message {}", i));
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let hub = hub();
        let _bob_inbox = hub.register(PartyId::new("bob"));

        let mut alice_end = hub
            .open(PartyId::new("alice"), PartyId::new("bob"))
            .await
            .unwrap();

        // Nobody ever answers
        let result = alice_end.receive().await;
        assert!(matches!(result, Err(FlowError::SessionFailure { .. })));
    }

    #[tokio::test]
    async fn test_receive_on_dropped_peer_fails() {
        let hub = hub();
        let mut bob_inbox = hub.register(PartyId::new("bob"));

        let mut alice_end = hub
            .open(PartyId::new("alice"), PartyId::new("bob"))
            .await
            .unwrap();

        let bob_end = bob_inbox.recv().await.unwrap();
        drop(bob_end);

        let result = alice_end.receive().await;
        assert!(matches!(result, Err(FlowError::SessionFailure { .. })));
    }
}
