use std::collections::HashMap;

use super::{Account, AccountId, Cents, Transaction};

/// Compute an account's balance from its transaction history.
/// Balance = sum of deposits - sum of withdrawals.
pub fn compute_balance(account_id: AccountId, transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .filter(|txn| txn.account_id == account_id)
        .map(|txn| txn.signed_amount())
        .sum()
}

/// Compute balances for all accounts referenced by a transaction list.
/// Accounts with no transactions are absent from the map (balance 0).
pub fn compute_all_balances(transactions: &[Transaction]) -> HashMap<AccountId, Cents> {
    let mut balances: HashMap<AccountId, Cents> = HashMap::new();

    for txn in transactions {
        *balances.entry(txn.account_id).or_insert(0) += txn.signed_amount();
    }

    balances
}

/// A stored balance that disagrees with the transaction history.
#[derive(Debug, Clone)]
pub struct BalanceMismatch {
    pub account_id: AccountId,
    pub account_name: String,
    pub stored: Cents,
    pub computed: Cents,
}

/// Result of verifying the ledger invariants against stored state.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    /// Accounts whose stored balance differs from the signed sum of their
    /// transaction history.
    pub mismatches: Vec<BalanceMismatch>,
    /// Accounts holding a negative stored balance.
    pub negative_balances: Vec<AccountId>,
    /// Transactions referencing an account id that does not exist.
    pub dangling_transactions: Vec<AccountId>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
            && self.negative_balances.is_empty()
            && self.dangling_transactions.is_empty()
    }
}

/// Verify the balance invariant for every account: each stored balance must
/// equal the signed sum of that account's transactions and must not be
/// negative, and every transaction must reference a known account.
pub fn verify_integrity(accounts: &[Account], transactions: &[Transaction]) -> IntegrityReport {
    let computed = compute_all_balances(transactions);
    let mut report = IntegrityReport {
        account_count: accounts.len(),
        transaction_count: transactions.len(),
        ..Default::default()
    };

    for account in accounts {
        let expected = computed.get(&account.id).copied().unwrap_or(0);
        if account.balance != expected {
            report.mismatches.push(BalanceMismatch {
                account_id: account.id,
                account_name: account.name.clone(),
                stored: account.balance,
                computed: expected,
            });
        }
        if account.balance < 0 {
            report.negative_balances.push(account.id);
        }
    }

    let known: std::collections::HashSet<AccountId> =
        accounts.iter().map(|account| account.id).collect();
    for txn in transactions {
        if !known.contains(&txn.account_id) {
            report.dangling_transactions.push(txn.account_id);
        }
    }

    report
}
