mod common;

use anyhow::Result;
use common::{funded_account, test_service};
use passbook::domain::TransactionKind;
use passbook::io::Exporter;

#[tokio::test]
async fn test_export_accounts_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;

    funded_account(&service, "Alice", 10000).await?;
    funded_account(&service, "Bob", 5000).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_accounts_csv(&mut buffer).await?;

    assert_eq!(count, 2);
    let csv = String::from_utf8(buffer)?;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,name,account_type,balance_cents,created_at")
    );
    assert!(csv.contains("Alice"));
    assert!(csv.contains("10000"));

    Ok(())
}

#[tokio::test]
async fn test_export_transactions_csv_in_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = funded_account(&service, "Alice", 10000).await?;
    service
        .apply_transaction(account.id, 2500, TransactionKind::Withdrawal)
        .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_transactions_csv(&mut buffer).await?;

    assert_eq!(count, 2);
    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3); // header + 2 rows
    assert!(lines[1].contains("deposit"));
    assert!(lines[2].contains("withdrawal"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = funded_account(&service, "Alice", 10000).await?;
    service
        .apply_transaction(account.id, 100, TransactionKind::Withdrawal)
        .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let snapshot = exporter.export_full_json(&mut buffer).await?;

    assert_eq!(snapshot.accounts.len(), 1);
    assert_eq!(snapshot.transactions.len(), 2);

    // The written JSON parses back into the same shape
    let parsed: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed["accounts"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["transactions"].as_array().unwrap().len(), 2);

    Ok(())
}
