//! Identity directory
//!
//! Resolves party identifiers to Ed25519 verifying keys and names the
//! notary for new proposals. Stands in for the network's identity and key
//! management service; signing capability stays with each party's own
//! key pair and never passes through here.

use crate::{FlowError, Result};
use dashmap::DashMap;
use iou_ledger::PartyId;

/// Registry of party verifying keys plus the notary identity
#[derive(Debug)]
pub struct Directory {
    keys: DashMap<PartyId, [u8; 32]>,
    notary: PartyId,
}

impl Directory {
    /// Create a directory naming the given notary
    pub fn new(notary: PartyId) -> Self {
        Self {
            keys: DashMap::new(),
            notary,
        }
    }

    /// Register a party's verifying key
    pub fn register(&self, party: PartyId, public_key: [u8; 32]) {
        self.keys.insert(party, public_key);
    }

    /// Resolve a party to its verifying key
    pub fn resolve(&self, party: &PartyId) -> Result<[u8; 32]> {
        self.keys
            .get(party)
            .map(|entry| *entry.value())
            .ok_or_else(|| FlowError::UnknownParty(party.clone()))
    }

    /// The notary identity new proposals should name
    pub fn notary(&self) -> PartyId {
        self.notary.clone()
    }
}
