use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;

/// Direction of a transaction. The amount itself is always positive; the
/// kind decides whether it credits or debits the account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credits the account: balance increases by the amount.
    Deposit,
    /// Debits the account: balance decreases by the amount. Rejected when
    /// the amount exceeds the current balance.
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = UnknownTransactionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            other => Err(UnknownTransactionKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransactionKind(pub String);

impl std::fmt::Display for UnknownTransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown transaction type: {}", self.0)
    }
}

impl std::error::Error for UnknownTransactionKind {}

/// An immutable record of a deposit or withdrawal applied to one account.
/// Once recorded, a transaction is never updated or deleted; corrections
/// would be new transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Amount in cents, always positive. Direction is carried by `kind`.
    pub amount_cents: Cents,
    pub kind: TransactionKind,
    /// Monotonically increasing insertion order, assigned by the repository.
    pub sequence: i64,
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction record. The sequence number is assigned by
    /// the repository when the record is persisted.
    pub fn new(account_id: AccountId, amount_cents: Cents, kind: TransactionKind) -> Self {
        assert!(amount_cents > 0, "transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_id,
            amount_cents,
            kind,
            sequence: 0,
            recorded_at: Utc::now(),
        }
    }

    /// The amount with its direction applied: positive for deposits,
    /// negative for withdrawals.
    pub fn signed_amount(&self) -> Cents {
        match self.kind {
            TransactionKind::Deposit => self.amount_cents,
            TransactionKind::Withdrawal => -self.amount_cents,
        }
    }
}
