use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Account, AccountId, Transaction, TransactionKind};

use super::MIGRATION_001_INITIAL;

/// Ledger store: durable holder of account and transaction records, keyed
/// by generated id. Business validation (empty fields, funds sufficiency)
/// is not done here; that belongs to the service layer.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Create and persist a new account with a zero balance.
    pub async fn create_account(&self, name: &str, account_type: &str) -> Result<Account> {
        let account = Account::new(name, account_type);

        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, account_type, balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.account_type)
        .bind(account.balance)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(account)
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, account_type, balance_cents, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Find all accounts carrying a name, in creation order. Names are not
    /// unique keys; callers decide what more than one match means.
    pub async fn find_accounts_by_name(&self, name: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, account_type, balance_cents, created_at
            FROM accounts
            WHERE name = ?
            ORDER BY rowid
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch accounts by name")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, account_type, balance_cents, created_at
            FROM accounts
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Persist an updated balance for an existing account. Normal writes go
    /// through `apply_transaction`; this exists for balance repair.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query("UPDATE accounts SET balance_cents = ? WHERE id = ?")
            .bind(account.balance)
            .bind(account.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update account")?;
        Ok(())
    }

    /// The `n` accounts with the highest balances, descending. Ties are
    /// broken by creation order (first created wins).
    pub async fn top_accounts_by_balance(&self, n: usize) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, account_type, balance_cents, created_at
            FROM accounts
            ORDER BY balance_cents DESC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list top accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            name: row.get("name"),
            account_type: row.get("account_type"),
            balance: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Atomically apply a transaction: adjust the account balance and insert
    /// the transaction record in one SQL transaction, assigning the next
    /// sequence number. Either both writes commit or neither does.
    ///
    /// The balance update carries a `balance + delta >= 0` guard evaluated
    /// inside the same statement, so a concurrent writer that drains the
    /// balance first cannot be lost-updated over. Returns `false` (after
    /// rolling back) when the guard rejects the update.
    pub async fn apply_transaction(&self, txn: &mut Transaction) -> Result<bool> {
        let delta = txn.signed_amount();
        let mut db_tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?
            WHERE id = ? AND balance_cents + ? >= 0
            "#,
        )
        .bind(delta)
        .bind(txn.account_id.to_string())
        .bind(delta)
        .execute(&mut *db_tx)
        .await
        .context("Failed to update balance")?;

        if updated.rows_affected() == 0 {
            db_tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *db_tx)
        .await
        .context("Failed to get next sequence number")?;
        txn.sequence = row.get("value");

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, account_id, amount_cents, kind, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(txn.id.to_string())
        .bind(txn.sequence)
        .bind(txn.account_id.to_string())
        .bind(txn.amount_cents)
        .bind(txn.kind.as_str())
        .bind(txn.recorded_at.to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .context("Failed to save transaction")?;

        db_tx.commit().await.context("Failed to commit")?;
        Ok(true)
    }

    /// List transactions in insertion order, optionally filtered to one
    /// account.
    pub async fn list_transactions(&self, account_id: Option<AccountId>) -> Result<Vec<Transaction>> {
        let rows = match account_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT id, sequence, account_id, amount_cents, kind, recorded_at
                    FROM transactions
                    WHERE account_id = ?
                    ORDER BY sequence
                    "#,
                )
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, sequence, account_id, amount_cents, kind, recorded_at
                    FROM transactions
                    ORDER BY sequence
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count transactions for an account.
    pub async fn count_transactions_for_account(&self, account_id: AccountId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE account_id = ?")
            .bind(account_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;

        Ok(row.get("count"))
    }

    /// Timestamp of the most recent transaction for an account, if any.
    pub async fn get_last_activity(&self, account_id: AccountId) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(recorded_at) as last_activity
            FROM transactions
            WHERE account_id = ?
            "#,
        )
        .bind(account_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to get last activity")?;

        let last_activity: Option<String> = row.get("last_activity");
        match last_activity {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)
                    .context("Invalid timestamp")?
                    .with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let kind_str: String = row.get("kind");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            amount_cents: row.get("amount_cents"),
            kind: kind_str
                .parse::<TransactionKind>()
                .context("Invalid transaction kind")?,
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
