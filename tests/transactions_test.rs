mod common;

use anyhow::Result;
use common::{funded_account, test_service};
use passbook::application::AppError;
use passbook::domain::{compute_balance, TransactionKind};
use uuid::Uuid;

#[tokio::test]
async fn test_deposit_then_withdraw_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // create account("Alice","checking") -> balance 0
    let account = service.create_account("Alice", "checking").await?;
    assert_eq!(account.balance, 0);

    // deposit 100 -> balance 100, one transaction recorded
    service
        .apply_transaction(account.id, 10000, TransactionKind::Deposit)
        .await?;
    assert_eq!(service.get_account(account.id).await?.balance, 10000);
    assert_eq!(service.list_transactions(Some(account.id)).await?.len(), 1);

    // withdraw 150 -> insufficient funds, balance and history unchanged
    let result = service
        .apply_transaction(account.id, 15000, TransactionKind::Withdrawal)
        .await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
    assert_eq!(service.get_account(account.id).await?.balance, 10000);
    assert_eq!(service.list_transactions(Some(account.id)).await?.len(), 1);

    // withdraw 40 -> balance 60, two transactions
    service
        .apply_transaction(account.id, 4000, TransactionKind::Withdrawal)
        .await?;
    assert_eq!(service.get_account(account.id).await?.balance, 6000);
    assert_eq!(service.list_transactions(Some(account.id)).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_unknown_account_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .apply_transaction(Uuid::new_v4(), 1000, TransactionKind::Deposit)
        .await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    // No transaction was created anywhere
    assert!(service.list_transactions(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.create_account("Alice", "checking").await?;

    let result = service
        .apply_transaction(account.id, 0, TransactionKind::Deposit)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = service
        .apply_transaction(account.id, -500, TransactionKind::Deposit)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert!(service.list_transactions(None).await?.is_empty());
    assert_eq!(service.get_account(account.id).await?.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_error_carries_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = funded_account(&service, "Alice", 5000).await?;

    let result = service
        .apply_transaction(account.id, 7500, TransactionKind::Withdrawal)
        .await;

    match result {
        Err(AppError::InsufficientFunds {
            account,
            balance_cents,
            required_cents,
        }) => {
            assert_eq!(account, "Alice");
            assert_eq!(balance_cents, 5000);
            assert_eq!(required_cents, 7500);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other.map(|t| t.id)),
    }

    Ok(())
}

#[tokio::test]
async fn test_failed_withdrawal_leaves_history_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = funded_account(&service, "Alice", 10000).await?;
    service
        .apply_transaction(account.id, 2500, TransactionKind::Withdrawal)
        .await?;

    let before = service.list_transactions(Some(account.id)).await?;
    let sum_before: i64 = before.iter().map(|t| t.signed_amount()).sum();

    let result = service
        .apply_transaction(account.id, 99999, TransactionKind::Withdrawal)
        .await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

    let after = service.list_transactions(Some(account.id)).await?;
    let sum_after: i64 = after.iter().map(|t| t.signed_amount()).sum();

    assert_eq!(before.len(), after.len());
    assert_eq!(sum_before, sum_after);
    assert_eq!(service.get_account(account.id).await?.balance, sum_after);

    Ok(())
}

#[tokio::test]
async fn test_withdrawal_of_exact_balance_succeeds() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = funded_account(&service, "Alice", 5000).await?;
    service
        .apply_transaction(account.id, 5000, TransactionKind::Withdrawal)
        .await?;

    assert_eq!(service.get_account(account.id).await?.balance, 0);

    Ok(())
}

#[tokio::test]
async fn test_balance_equals_signed_sum_of_history() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = funded_account(&service, "Alice", 20000).await?;
    let bob = funded_account(&service, "Bob", 5000).await?;

    service
        .apply_transaction(alice.id, 3000, TransactionKind::Withdrawal)
        .await?;
    service
        .apply_transaction(alice.id, 1500, TransactionKind::Deposit)
        .await?;
    service
        .apply_transaction(bob.id, 5000, TransactionKind::Withdrawal)
        .await?;

    let transactions = service.list_transactions(None).await?;
    for account in service.list_accounts().await? {
        assert_eq!(
            account.balance,
            compute_balance(account.id, &transactions),
            "balance invariant violated for {}",
            account.name
        );
        assert!(account.balance >= 0);
    }

    Ok(())
}

#[tokio::test]
async fn test_concurrent_withdrawals_cannot_both_drain_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // Balance 100; two concurrent withdrawals of 60 can fund at most one.
    let account = funded_account(&service, "Alice", 10000).await?;

    let first = service.apply_transaction(account.id, 6000, TransactionKind::Withdrawal);
    let second = service.apply_transaction(account.id, 6000, TransactionKind::Withdrawal);
    let (first, second) = tokio::join!(first, second);

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one withdrawal must win");

    for result in [first, second] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::InsufficientFunds { .. }));
        }
    }

    assert_eq!(service.get_account(account.id).await?.balance, 4000);
    assert_eq!(service.list_transactions(Some(account.id)).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_transactions_are_sequenced_in_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = funded_account(&service, "Alice", 10000).await?;
    let bob = funded_account(&service, "Bob", 10000).await?;
    service
        .apply_transaction(alice.id, 100, TransactionKind::Withdrawal)
        .await?;
    service
        .apply_transaction(bob.id, 200, TransactionKind::Withdrawal)
        .await?;

    let transactions = service.list_transactions(None).await?;
    let sequences: Vec<i64> = transactions.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    Ok(())
}
