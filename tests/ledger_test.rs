mod common;

use anyhow::Result;
use common::{shared_service, test_service, StandardCustomers};
use tally::application::AppError;
use tally::domain::{TransactionKind, DEFAULT_INTEREST_RATE};

#[tokio::test]
async fn test_deposit_adds_to_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;

    let balance = service.deposit(&customer.id, 5_000).await?;
    assert_eq!(balance, 15_000);
    assert_eq!(service.get_balance(&customer.id).await?, 15_000);

    let transactions = service.list_transactions(&customer.id).await?;
    assert_eq!(transactions.len(), 2);
    let last = transactions.last().unwrap();
    assert_eq!(last.kind, TransactionKind::Deposit);
    assert_eq!(last.amount, 5_000);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_subtracts_from_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;

    let balance = service.withdraw(&customer.id, 10_000).await?;
    assert_eq!(balance, 0);

    let transactions = service.list_transactions(&customer.id).await?;
    let last = transactions.last().unwrap();
    assert_eq!(last.kind, TransactionKind::Withdraw);
    assert_eq!(last.amount, 10_000);

    Ok(())
}

#[tokio::test]
async fn test_overdraft_is_rejected_without_side_effects() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;

    let err = service.withdraw(&customer.id, 20_000).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientBalance { balance: 10_000, required: 20_000, .. }
    ));

    assert_eq!(service.get_balance(&customer.id).await?, 10_000);
    assert_eq!(service.list_transactions(&customer.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unknown_customer_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.deposit("DM99", 100).await.unwrap_err().is_not_found());
    assert!(service.withdraw("DM99", 100).await.unwrap_err().is_not_found());
    assert!(service.get_balance("DM99").await.unwrap_err().is_not_found());
    assert!(service.list_transactions("DM99").await.unwrap_err().is_not_found());

    assert!(service.list_all_transactions().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_negative_deposit_is_accepted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;

    let balance = service.deposit(&customer.id, -2_500).await?;
    assert_eq!(balance, 7_500);

    Ok(())
}

#[tokio::test]
async fn test_interest_credits_every_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCustomers::create_groups(&service).await?;
    let rich = StandardCustomers::funded(&service, "rich@example.com", Some("AB"), 100_000).await?;
    let poor = StandardCustomers::funded(&service, "poor@example.com", None, 0).await?;

    let count = service.apply_interest_all(DEFAULT_INTEREST_RATE).await?;
    assert_eq!(count, 2);

    assert_eq!(service.get_balance(&rich.id).await?, 102_500);
    assert_eq!(service.get_balance(&poor.id).await?, 0);

    let rich_log = service.list_transactions(&rich.id).await?;
    let interest = rich_log.last().unwrap();
    assert_eq!(interest.kind, TransactionKind::Interest);
    assert_eq!(interest.amount, 2_500);

    // Zero balances still get a (zero) interest entry
    let poor_log = service.list_transactions(&poor.id).await?;
    assert_eq!(poor_log.len(), 1);
    assert_eq!(poor_log[0].kind, TransactionKind::Interest);
    assert_eq!(poor_log[0].amount, 0);

    Ok(())
}

#[tokio::test]
async fn test_interest_on_empty_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert_eq!(service.apply_interest_all(DEFAULT_INTEREST_RATE).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_interest_rejects_non_finite_rate() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;

    let err = service.apply_interest_all(f64::NAN).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert_eq!(service.get_balance(&customer.id).await?, 10_000);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_all_land() -> Result<()> {
    let (service, _temp) = shared_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 0).await?;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = service.clone();
        let id = customer.id.clone();
        handles.push(tokio::spawn(async move { service.deposit(&id, 100).await }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.get_balance(&customer.id).await?, 2_000);
    assert_eq!(service.list_transactions(&customer.id).await?.len(), 20);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
    let (service, _temp) = shared_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 500).await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        let id = customer.id.clone();
        handles.push(tokio::spawn(async move { service.withdraw(&id, 100).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientBalance { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(service.get_balance(&customer.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_integrity_check_on_healthy_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, 10_000).await?;
    service.withdraw(&customer.id, 2_500).await?;
    service.apply_interest_all(DEFAULT_INTEREST_RATE).await?;

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    assert_eq!(report.customer_count, 1);
    assert_eq!(report.transaction_count, 3);
    assert_eq!(report.total_balance, 7_688);

    Ok(())
}

#[tokio::test]
async fn test_deposit_past_max_balance_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let near_max = i64::MAX - 100;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, near_max).await?;

    let err = service.deposit(&customer.id, 101).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    // Row is still readable and untouched
    assert_eq!(service.get_balance(&customer.id).await?, near_max);
    assert_eq!(service.list_transactions(&customer.id).await?.len(), 1);

    // Exactly reaching the maximum is fine
    assert_eq!(service.deposit(&customer.id, 100).await?, i64::MAX);

    Ok(())
}

#[tokio::test]
async fn test_negative_withdrawal_past_max_balance_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let customer = StandardCustomers::funded(&service, "ann@example.com", None, i64::MAX).await?;

    let err = service.withdraw(&customer.id, -1).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));
    assert_eq!(service.get_balance(&customer.id).await?, i64::MAX);

    Ok(())
}

#[tokio::test]
async fn test_interest_overflow_leaves_every_balance_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let modest = StandardCustomers::funded(&service, "ann@example.com", None, 100_000).await?;
    let huge = StandardCustomers::funded(&service, "bob@example.com", None, i64::MAX - 10).await?;

    let err = service.apply_interest_all(DEFAULT_INTEREST_RATE).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    assert_eq!(service.get_balance(&modest.id).await?, 100_000);
    assert_eq!(service.get_balance(&huge.id).await?, i64::MAX - 10);
    assert_eq!(service.list_all_transactions().await?.len(), 2);

    let report = service.check_integrity().await?;
    assert!(report.is_healthy(), "issues: {:?}", report.issues);

    Ok(())
}
