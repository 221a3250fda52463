use crate::core::constants::WALLETS_COLLECTION;
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{SettlementStatus, SplitMethod, WalletTransactionKind};
use crate::core::services::LedgerService;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::DocumentStore;
use crate::infrastructure::storage::in_memory::InMemoryDocumentStore;
use crate::tests::{TestService, create_test_service, new_split, participants};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

async fn balance(service: &TestService, user_id: &str) -> Decimal {
    service.wallet_balance(user_id).await.unwrap().balance("EUR")
}

async fn dinner_for_three(service: &TestService) -> String {
    service
        .create_split(new_split(
            dec!(90),
            SplitMethod::Equally,
            "alice",
            participants(&["alice", "bob", "carol"]),
            None,
        ))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_deposit_and_withdraw() {
    let service = create_test_service();
    assert_eq!(balance(&service, "bob").await, Decimal::ZERO);

    let wallet = service.deposit("bob", dec!(50), "eur").await.unwrap();
    assert_eq!(wallet.balance("EUR"), dec!(50));

    let wallet = service.withdraw("bob", dec!(20), "EUR").await.unwrap();
    assert_eq!(wallet.balance("EUR"), dec!(30));

    let result = service.withdraw("bob", dec!(40), "EUR").await;
    match result {
        Err(LedgerError::InsufficientFunds { available, required, .. }) => {
            assert_eq!(available, dec!(30));
            assert_eq!(required, dec!(40));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(balance(&service, "bob").await, dec!(30));

    let history = service.wallet_history("bob").await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_wallet_input_validation() {
    let service = create_test_service();

    let result = service.withdraw("nobody", dec!(1), "EUR").await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { available, .. }) if available == Decimal::ZERO));

    let result = service.deposit("bob", dec!(0), "EUR").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::NonPositiveAmount(_)))));

    let result = service.deposit("bob", dec!(10.001), "EUR").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::InvalidInput(..)))));

    let result = service.deposit("bob", dec!(10), "EURO").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::InvalidCurrency(_)))));

    assert!(service.wallet_history("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_balances_are_kept_per_currency() {
    let service = create_test_service();
    service.deposit("bob", dec!(10), "EUR").await.unwrap();
    service.deposit("bob", dec!(1500), "JPY").await.unwrap();

    let result = service.withdraw("bob", dec!(11), "EUR").await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

    let wallet = service.withdraw("bob", dec!(500), "JPY").await.unwrap();
    assert_eq!(wallet.balance("JPY"), dec!(1000));
    assert_eq!(wallet.balance("EUR"), dec!(10));
    assert_eq!(wallet.balance("USD"), Decimal::ZERO);
}

#[tokio::test]
async fn test_transfer_funds() {
    let service = create_test_service();
    service.deposit("alice", dec!(100), "EUR").await.unwrap();

    let from = service.transfer_funds("alice", "bob", dec!(30), "EUR").await.unwrap();
    assert_eq!(from.balance("EUR"), dec!(70));
    assert_eq!(balance(&service, "bob").await, dec!(30));

    let result = service.transfer_funds("alice", "alice", dec!(1), "EUR").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::SelfTransfer))));

    let result = service.transfer_funds("bob", "alice", dec!(31), "EUR").await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    assert_eq!(balance(&service, "alice").await, dec!(70));
    assert_eq!(balance(&service, "bob").await, dec!(30));

    let history = service.wallet_history("bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, WalletTransactionKind::Transfer);
    assert_eq!(history[0].from_user_id.as_deref(), Some("alice"));
    assert_eq!(history[0].to_user_id.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_settle_with_wallet_moves_money_and_settles() {
    let service = create_test_service();
    let split_id = dinner_for_three(&service).await;
    service.deposit("bob", dec!(50), "EUR").await.unwrap();

    let record = service.settle_with_wallet(&split_id, "bob").await.unwrap();
    assert_eq!(
        record.participant("bob").unwrap().settlement_status,
        SettlementStatus::Settled
    );
    assert_eq!(balance(&service, "bob").await, dec!(20));
    assert_eq!(balance(&service, "alice").await, dec!(30));

    let history = service.wallet_history("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, WalletTransactionKind::SplitSettlement);
    assert_eq!(history[0].split_id.as_deref(), Some(split_id.as_str()));

    let result = service.settle_with_wallet(&split_id, "bob").await;
    assert!(matches!(result, Err(LedgerError::InvalidState { .. })));
    assert_eq!(balance(&service, "bob").await, dec!(20));
    assert_eq!(balance(&service, "alice").await, dec!(30));
}

#[tokio::test]
async fn test_failed_wallet_settlement_changes_nothing() {
    let service = create_test_service();
    let split_id = dinner_for_three(&service).await;

    // carol never funded a wallet
    let result = service.settle_with_wallet(&split_id, "carol").await;
    match result {
        Err(LedgerError::InsufficientFunds { available, required, .. }) => {
            assert_eq!(available, Decimal::ZERO);
            assert_eq!(required, dec!(30));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert!(service.storage().read_document(WALLETS_COLLECTION, "carol").await.unwrap().is_none());

    service.deposit("carol", dec!(10), "EUR").await.unwrap();
    let result = service.settle_with_wallet(&split_id, "carol").await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

    let record = service.get_split(&split_id).await.unwrap();
    assert_eq!(
        record.participant("carol").unwrap().settlement_status,
        SettlementStatus::Unsettled
    );
    assert_eq!(balance(&service, "carol").await, dec!(10));
    assert_eq!(balance(&service, "alice").await, Decimal::ZERO);

    let result = service.settle_with_wallet(&split_id, "dave").await;
    assert!(matches!(result, Err(LedgerError::NotFound { entity, .. }) if entity == "Obligation"));
}

#[tokio::test]
async fn test_pending_obligation_cannot_be_wallet_settled() {
    let service = create_test_service();
    let split_id = dinner_for_three(&service).await;
    service.deposit("bob", dec!(50), "EUR").await.unwrap();
    service.request_manual_settlement(&split_id, "bob").await.unwrap();

    let result = service.settle_with_wallet(&split_id, "bob").await;
    assert!(matches!(result, Err(LedgerError::InvalidState { .. })));
    assert_eq!(balance(&service, "bob").await, dec!(50));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlement_of_same_obligation_succeeds_once() {
    let service = Arc::new(create_test_service());
    let split_id = dinner_for_three(&service).await;
    service.deposit("bob", dec!(40), "EUR").await.unwrap();

    let handles = (0..2).map(|_| {
        let service = Arc::clone(&service);
        let split_id = split_id.clone();
        tokio::spawn(async move { service.settle_with_wallet(&split_id, "bob").await })
    });
    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(LedgerError::InvalidState { .. })))
    );
    assert_eq!(balance(&service, "bob").await, dec!(10));
    assert_eq!(balance(&service, "alice").await, dec!(30));

    let settlements = service
        .wallet_history("bob")
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == WalletTransactionKind::SplitSettlement)
        .count();
    assert_eq!(settlements, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlements_never_overdraw() {
    let service = Arc::new(create_test_service());
    let first = dinner_for_three(&service).await;
    let second = dinner_for_three(&service).await;
    service.deposit("bob", dec!(40), "EUR").await.unwrap();

    let handles = [first, second].into_iter().map(|split_id| {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.settle_with_wallet(&split_id, "bob").await })
    });
    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
    );
    assert_eq!(balance(&service, "bob").await, dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_are_not_lost() {
    let service: Arc<TestService> = Arc::new(LedgerService::new(
        InMemoryDocumentStore::new(1000),
        InMemoryLogging::new(),
    ));

    let handles = (0..20).map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.deposit("bob", dec!(1.50), "EUR").await })
    });
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(balance(&service, "bob").await, dec!(30.00));
    assert_eq!(service.wallet_history("bob").await.unwrap().len(), 20);
}
