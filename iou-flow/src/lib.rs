//! IOU Issuance Agreement Protocol
//!
//! Multi-party agreement over new IOU obligations: the initiating party
//! proposes a transaction, every participant validates it independently
//! and endorses it, and an external notarization service sequences the
//! result exactly once. No party ever signs a transaction it did not
//! validate itself.
//!
//! # Architecture
//!
//! - **Explicit state machine**: `Building → Proposed →
//!   CollectingSignatures → ReadyToFinalize → Finalized`, with
//!   `Rejected`/`Aborted` terminals carrying specific reasons
//! - **Sessions**: private, ordered, bidirectional channels between two
//!   participants for the duration of one instance
//! - **Single serialization point**: cross-instance consistency is
//!   delegated entirely to the notary; instances share no mutable state
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use iou_flow::{Directory, FlowConfig, NotaryService, Party, SessionHub};
//! use iou_ledger::{Amount, Currency, ObligationState, PartyId};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> iou_flow::Result<()> {
//!     let notary = Arc::new(NotaryService::new(PartyId::new("notary")));
//!     let directory = Arc::new(Directory::new(notary.identity()));
//!     let hub = Arc::new(SessionHub::new(FlowConfig::default()));
//!
//!     let alice = Party::spawn(PartyId::new("alice"), hub.clone(), notary.clone(), directory.clone());
//!     let _bob = Party::spawn(PartyId::new("bob"), hub, notary, directory);
//!
//!     let obligation = ObligationState::new(
//!         PartyId::new("alice"),
//!         PartyId::new("bob"),
//!         Amount::new(Decimal::new(10000, 2), Currency::USD),
//!     );
//!     let reference = alice.issue(obligation).await?;
//!     println!("finalized: {}", reference);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod flow;
pub mod identity;
pub mod node;
pub mod notary;
pub mod session;

// Re-exports
pub use config::FlowConfig;
pub use error::{FlowError, Result};
pub use flow::FlowState;
pub use identity::Directory;
pub use node::Party;
pub use notary::NotaryService;
pub use session::{Session, SessionHub, SessionMessage};
