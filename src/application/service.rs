use chrono::{DateTime, Utc};

use crate::domain::{
    verify_integrity, Account, AccountId, Cents, IntegrityReport, Transaction, TransactionKind,
};
use crate::storage::Repository;

use super::AppError;

/// Number of accounts returned by `top_accounts` when no limit is given.
const DEFAULT_TOP_N: usize = 5;

/// Application service providing the ledger operations. This is the only
/// place the balance invariant is enforced; every client (CLI, API, tests)
/// goes through it.
pub struct LedgerService {
    repo: Repository,
}

/// Detailed account information for the account detail view.
pub struct AccountInfo {
    pub account: Account,
    pub transaction_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Result of repairing drifted balances from transaction history.
pub struct RepairResult {
    pub report: IntegrityReport,
    pub repaired: usize,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account. Name and type must be non-empty.
    pub async fn create_account(
        &self,
        name: &str,
        account_type: &str,
    ) -> Result<Account, AppError> {
        let name = name.trim();
        let account_type = account_type.trim();

        if name.is_empty() {
            return Err(AppError::Validation("account name must not be empty".into()));
        }
        if account_type.is_empty() {
            return Err(AppError::Validation("account type must not be empty".into()));
        }

        Ok(self.repo.create_account(name, account_type).await?)
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Find an account by name. Names are not unique keys, so a name shared
    /// by several accounts is rejected rather than resolved arbitrarily;
    /// those accounts remain addressable by id.
    pub async fn find_account(&self, name: &str) -> Result<Account, AppError> {
        let mut matches = self.repo.find_accounts_by_name(name).await?;
        match matches.len() {
            0 => Err(AppError::AccountNotFound(name.to_string())),
            1 => Ok(matches.remove(0)),
            _ => {
                let ids: Vec<String> = matches.iter().map(|a| a.id.to_string()).collect();
                Err(AppError::Validation(format!(
                    "account name '{}' is ambiguous, matching ids: {}",
                    name,
                    ids.join(", ")
                )))
            }
        }
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Get detailed account information.
    pub async fn get_account_info(&self, name: &str) -> Result<AccountInfo, AppError> {
        let account = self.find_account(name).await?;
        let transaction_count = self.repo.count_transactions_for_account(account.id).await?;
        let last_activity = self.repo.get_last_activity(account.id).await?;

        Ok(AccountInfo {
            account,
            transaction_count,
            last_activity,
        })
    }

    /// The accounts with the highest balances, descending, ties broken by
    /// creation order. `n` defaults to 5.
    pub async fn top_accounts(&self, n: Option<usize>) -> Result<Vec<Account>, AppError> {
        Ok(self
            .repo
            .top_accounts_by_balance(n.unwrap_or(DEFAULT_TOP_N))
            .await?)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Validate and apply a single transaction against one account.
    ///
    /// The balance update and the transaction insert happen as one atomic
    /// unit in the store; a rejected transaction leaves both the balance
    /// and the transaction history exactly as they were.
    pub async fn apply_transaction(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        kind: TransactionKind,
    ) -> Result<Transaction, AppError> {
        let account = self.get_account(account_id).await?;

        if amount_cents <= 0 {
            return Err(AppError::Validation(
                "transaction amount must be positive".into(),
            ));
        }

        if kind == TransactionKind::Withdrawal && amount_cents > account.balance {
            return Err(AppError::InsufficientFunds {
                account: account.name,
                balance_cents: account.balance,
                required_cents: amount_cents,
            });
        }

        let mut txn = Transaction::new(account_id, amount_cents, kind);
        let applied = self.repo.apply_transaction(&mut txn).await?;

        if !applied {
            // A concurrent withdrawal won the race; re-read for the message.
            let account = self.get_account(account_id).await?;
            return Err(AppError::InsufficientFunds {
                account: account.name,
                balance_cents: account.balance,
                required_cents: amount_cents,
            });
        }

        Ok(txn)
    }

    /// List transactions in insertion order, optionally filtered to one
    /// account. An account with no transactions yields an empty list.
    pub async fn list_transactions(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions(account_id).await?)
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check that every stored balance matches its transaction history.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let transactions = self.repo.list_transactions(None).await?;
        Ok(verify_integrity(&accounts, &transactions))
    }

    /// Rewrite drifted balances from transaction history and report what
    /// was repaired.
    pub async fn repair_balances(&self) -> Result<RepairResult, AppError> {
        let report = self.check_integrity().await?;
        let mut repaired = 0;

        for mismatch in &report.mismatches {
            let mut account = self.get_account(mismatch.account_id).await?;
            account.balance = mismatch.computed;
            self.repo.save_account(&account).await?;
            repaired += 1;
        }

        Ok(RepairResult { report, repaired })
    }
}
