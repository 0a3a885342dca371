use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{PaymentMethod, Transaction},
    traits::{SettleResult, SettlementDetails},
};

/// The ways a gateway callback can point at a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum TransactionRef {
    Id { id: i64 },
    Number { number: String },
    /// The gateway's own identifier (payment intent id, session key)
    Gateway { method: PaymentMethod, reference: String },
}

impl TransactionRef {
    pub fn id(id: i64) -> Self {
        Self::Id { id }
    }

    pub fn number<S: Into<String>>(number: S) -> Self {
        Self::Number { number: number.into() }
    }

    pub fn gateway<S: Into<String>>(method: PaymentMethod, reference: S) -> Self {
        Self::Gateway { method, reference: reference.into() }
    }
}

impl Display for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionRef::Id { id } => write!(f, "#{id}"),
            TransactionRef::Number { number } => write!(f, "{number}"),
            TransactionRef::Gateway { method, reference } => write!(f, "{method}:{reference}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Success,
    Failure { reason: String },
}

/// A gateway's verdict on a payment, normalised so that every adapter settles through the same code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub transaction_ref: TransactionRef,
    pub outcome: SettlementOutcome,
    pub metadata: SettlementDetails,
}

impl SettlementEvent {
    pub fn success(transaction_ref: TransactionRef, metadata: SettlementDetails) -> Self {
        Self { transaction_ref, outcome: SettlementOutcome::Success, metadata }
    }

    pub fn failure<S: Into<String>>(transaction_ref: TransactionRef, reason: S, metadata: SettlementDetails) -> Self {
        Self { transaction_ref, outcome: SettlementOutcome::Failure { reason: reason.into() }, metadata }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "transaction", rename_all = "snake_case")]
pub enum SettlementResult {
    Settled(Transaction),
    /// A repeated confirmation. Nothing changed.
    AlreadySettled(Transaction),
    Failed(Transaction),
    /// A failure report for a transaction that had already reached a final state
    Unchanged(Transaction),
}

impl SettlementResult {
    pub fn transaction(&self) -> &Transaction {
        match self {
            SettlementResult::Settled(t)
            | SettlementResult::AlreadySettled(t)
            | SettlementResult::Failed(t)
            | SettlementResult::Unchanged(t) => t,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, SettlementResult::Settled(_) | SettlementResult::AlreadySettled(_))
    }
}

impl From<SettleResult> for SettlementResult {
    fn from(value: SettleResult) -> Self {
        match value {
            SettleResult::Settled(t) => Self::Settled(t),
            SettleResult::AlreadySettled(t) => Self::AlreadySettled(t),
        }
    }
}
