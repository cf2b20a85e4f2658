//! Core types for IOU issuance
//!
//! All types are designed for:
//! - Deterministic serialization (bincode, ordered collections)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Party identifier (public identity on the ledger)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    /// Create new party ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// UAE Dirham
    AED,
    /// Indian Rupee
    INR,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::INR => "INR",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            "INR" => Some(Currency::INR),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A tagged monetary amount (exact decimal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Quantity (exact decimal)
    pub quantity: Decimal,
    /// Currency tag
    pub currency: Currency,
}

impl Amount {
    /// Create new amount
    pub fn new(quantity: Decimal, currency: Currency) -> Self {
        Self { quantity, currency }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.currency)
    }
}

/// Obligation record: one party's debt to another
///
/// Immutable once embedded in a proposed transaction. Becomes a committed
/// ledger fact only after notarization, at which point both participants
/// hold a verified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationState {
    /// Party owed the amount
    pub lender: PartyId,

    /// Party owing the amount
    pub borrower: PartyId,

    /// Amount owed
    pub amount: Amount,
}

impl ObligationState {
    /// Create new obligation
    pub fn new(lender: PartyId, borrower: PartyId, amount: Amount) -> Self {
        Self {
            lender,
            borrower,
            amount,
        }
    }

    /// Parties that must sign any transaction involving this state
    pub fn participants(&self) -> BTreeSet<PartyId> {
        let mut set = BTreeSet::new();
        set.insert(self.lender.clone());
        set.insert(self.borrower.clone());
        set
    }
}

/// Reference to a consumed prior output
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateRef {
    /// Transaction that created the state
    pub tx_id: Uuid,
    /// Output index within that transaction
    pub output_index: u32,
}

/// Transaction intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Issue a new obligation
    Issue,
}

/// A command: tagged intent plus the declared required signers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// What the transaction intends to do
    pub kind: CommandKind,

    /// Parties whose signatures the transaction declares as required
    pub signers: BTreeSet<PartyId>,
}

impl Command {
    /// Create an Issue command with the given signer set
    pub fn issue(signers: BTreeSet<PartyId>) -> Self {
        Self {
            kind: CommandKind::Issue,
            signers,
        }
    }
}

/// A proposed ledger transaction (unsigned bundle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTransaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub tx_id: Uuid,

    /// Notary selected to sequence this transaction
    pub notary: PartyId,

    /// Consumed prior states (empty for issuance)
    pub inputs: Vec<StateRef>,

    /// Newly created states
    pub outputs: Vec<ObligationState>,

    /// Declared commands
    pub commands: Vec<Command>,

    /// Proposal timestamp
    pub created_at: DateTime<Utc>,
}

impl ProposedTransaction {
    /// Create canonical bytes for signing
    pub fn canonical_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// SHA-256 hash of the canonical bytes
    pub fn hash(&self) -> crate::Result<[u8; 32]> {
        Ok(crate::crypto::hash_bytes(&self.canonical_bytes()?))
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verify signature over a message
    pub fn verify(&self, message: &[u8], public_key: &[u8; 32]) -> bool {
        crate::crypto::verify_signature(message, self, public_key)
    }
}

/// A proposed transaction plus accumulated endorsements
///
/// Signatures are collected over the protocol run; the map is empty at
/// creation and must cover exactly the declared signer set before the
/// notary will sequence the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The underlying proposal
    pub tx: ProposedTransaction,

    /// Accumulated signatures, keyed by signer identity
    pub signatures: BTreeMap<PartyId, Signature>,
}

impl SignedTransaction {
    /// Wrap a proposal with no signatures yet
    pub fn new(tx: ProposedTransaction) -> Self {
        Self {
            tx,
            signatures: BTreeMap::new(),
        }
    }

    /// Record a party's signature
    pub fn add_signature(&mut self, party: PartyId, signature: Signature) {
        self.signatures.insert(party, signature);
    }

    /// Identities that have signed so far
    pub fn signer_set(&self) -> BTreeSet<PartyId> {
        self.signatures.keys().cloned().collect()
    }

    /// True when the signature set covers exactly the required set
    pub fn is_fully_signed(&self, required: &BTreeSet<PartyId>) -> bool {
        &self.signer_set() == required
    }

    /// Verify one party's signature against its verifying key
    pub fn verify_signature_of(&self, party: &PartyId, public_key: &[u8; 32]) -> crate::Result<()> {
        let signature = self
            .signatures
            .get(party)
            .ok_or_else(|| crate::Error::MissingSignature(party.clone()))?;
        let message = self.tx.canonical_bytes()?;
        if !signature.verify(&message, public_key) {
            return Err(crate::Error::SignatureInvalid(format!(
                "signature of {} does not verify",
                party
            )));
        }
        Ok(())
    }
}

/// A notarized transaction: a committed, queryable ledger fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    /// The fully-signed transaction
    pub stx: SignedTransaction,

    /// Sequence position assigned by the notary
    pub sequence: u64,
}

impl CommittedTransaction {
    /// Reference to this committed transaction
    pub fn reference(&self) -> FinalizedTxRef {
        FinalizedTxRef {
            tx_id: self.stx.tx.tx_id,
            sequence: self.sequence,
        }
    }
}

/// Reference returned to the issuing caller on finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTxRef {
    /// Transaction ID
    pub tx_id: Uuid,
    /// Notary-assigned sequence position
    pub sequence: u64,
}

impl fmt::Display for FinalizedTxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.sequence)
    }
}
