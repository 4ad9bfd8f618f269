use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AccountId = Uuid;

/// A named ledger entry holding a running balance.
///
/// `balance` is the only mutable field in the whole data model, and it is
/// only ever changed as a side effect of recording a transaction. Accounts
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Free-form category, e.g. "checking" or "savings".
    pub account_type: String,
    /// Running balance in cents. Invariant: equals the signed sum of all
    /// transactions referencing this account, and never negative.
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a fresh id and a zero balance.
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            account_type: account_type.into(),
            balance: 0,
            created_at: Utc::now(),
        }
    }
}
