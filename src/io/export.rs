use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, Transaction};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to CSV or JSON. Export is read-only;
/// there is deliberately no import path, since transactions may only enter
/// the ledger through the validated apply path.
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export accounts to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "name", "account_type", "balance_cents", "created_at"])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record(&[
                account.id.to_string(),
                account.name.clone(),
                account.account_type.clone(),
                account.balance.to_string(),
                account.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export transactions to CSV format, in insertion order
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions(None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "sequence",
            "account_id",
            "amount_cents",
            "kind",
            "recorded_at",
        ])?;

        let mut count = 0;
        for txn in &transactions {
            csv_writer.write_record(&[
                txn.id.to_string(),
                txn.sequence.to_string(),
                txn.account_id.to_string(),
                txn.amount_cents.to_string(),
                txn.kind.as_str().to_string(),
                txn.recorded_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full ledger as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let accounts = self.service.list_accounts().await?;
        let transactions = self.service.list_transactions(None).await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
