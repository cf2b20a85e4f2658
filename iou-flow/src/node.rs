//! Party node
//!
//! Bundles one party's key pair, vault, and collaborator handles, and
//! runs its responder accept-loop. The caller-facing surface is the
//! single operation [`Party::issue`].

use crate::flow;
use crate::identity::Directory;
use crate::notary::NotaryService;
use crate::session::SessionHub;
use crate::Result;
use iou_ledger::{crypto::KeyPair, FinalizedTxRef, ObligationState, PartyId, Vault};
use std::sync::Arc;

/// Shared per-party state, visible to both flow variants
#[derive(Debug)]
pub(crate) struct PartyContext {
    pub(crate) id: PartyId,
    pub(crate) keys: KeyPair,
    pub(crate) vault: Vault,
    pub(crate) directory: Arc<Directory>,
    pub(crate) hub: Arc<SessionHub>,
    pub(crate) notary: Arc<NotaryService>,
}

/// A protocol participant
///
/// Creating a party registers its verifying key with the directory,
/// registers it with the session transport, and spawns the accept-loop
/// that answers inbound proposals. Concurrent flows share only the
/// read-mostly collaborator registries; each instance is otherwise an
/// independent sequential task.
#[derive(Debug, Clone)]
pub struct Party {
    ctx: Arc<PartyContext>,
}

impl Party {
    /// Create a party and start its responder accept-loop
    pub fn spawn(
        id: PartyId,
        hub: Arc<SessionHub>,
        notary: Arc<NotaryService>,
        directory: Arc<Directory>,
    ) -> Self {
        let keys = KeyPair::generate();
        directory.register(id.clone(), keys.public_key());
        let mut inbox = hub.register(id.clone());

        let ctx = Arc::new(PartyContext {
            id,
            keys,
            vault: Vault::new(),
            directory,
            hub,
            notary,
        });

        let accept_ctx = ctx.clone();
        tokio::spawn(async move {
            // One task per inbound session; instances run fully in parallel
            while let Some(mut session) = inbox.recv().await {
                let ctx = accept_ctx.clone();
                tokio::spawn(async move {
                    if let Err(err) = flow::respond(&ctx, &mut session).await {
                        tracing::warn!(party = %ctx.id, error = %err, "responder flow ended in error");
                    }
                });
            }
            tracing::debug!(party = %accept_ctx.id, "accept-loop stopped");
        });

        Self { ctx }
    }

    /// Issue a new obligation on the ledger
    ///
    /// Runs the full agreement protocol as initiator and returns the
    /// finalized transaction reference, or the specific rejection or
    /// abort reason.
    pub async fn issue(&self, obligation: ObligationState) -> Result<FinalizedTxRef> {
        flow::initiate(&self.ctx, obligation).await
    }

    /// This party's identity
    pub fn id(&self) -> &PartyId {
        &self.ctx.id
    }

    /// This party's committed-fact store
    pub fn vault(&self) -> &Vault {
        &self.ctx.vault
    }
}
