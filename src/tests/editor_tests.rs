use crate::core::editor::SplitAmendment;
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{ParticipantInput, SettlementStatus, SplitMethod, SplitRecord};
use crate::tests::{TestService, create_test_service, new_split, participants, share};
use rust_decimal_macros::dec;

/// 50 paid by alice; bob's 20 already settled, carol's 30 still open.
async fn half_settled(service: &TestService) -> SplitRecord {
    let record = service
        .create_split(new_split(
            dec!(50),
            SplitMethod::ByAmount,
            "alice",
            vec![
                ParticipantInput::with_amount("bob", dec!(20)),
                ParticipantInput::with_amount("carol", dec!(30)),
            ],
            None,
        ))
        .await
        .unwrap();
    service.request_manual_settlement(&record.id, "bob").await.unwrap();
    service.approve_settlement(&record.id, "bob", "alice").await.unwrap()
}

fn amendment(total: rust_decimal::Decimal, paid_by: &str, inputs: Vec<ParticipantInput>) -> SplitAmendment {
    SplitAmendment {
        total_amount: total,
        paid_by: paid_by.to_string(),
        split_method: SplitMethod::Equally,
        participants: inputs,
    }
}

fn status(record: &SplitRecord, user_id: &str) -> SettlementStatus {
    record.participant(user_id).unwrap().settlement_status
}

#[tokio::test]
async fn test_amend_preserves_settled_shares() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let amended = service
        .amend_split(&record.id, amendment(dec!(70), "alice", vec![]), "alice")
        .await
        .unwrap();
    assert_eq!(amended.total_amount, dec!(70));
    assert_eq!(share(&amended, "bob"), dec!(20.00));
    assert_eq!(status(&amended, "bob"), SettlementStatus::Settled);
    assert_eq!(share(&amended, "carol"), dec!(50.00));
    assert_eq!(status(&amended, "carol"), SettlementStatus::Unsettled);
    assert_eq!(amended.split_method, SplitMethod::Equally);

    let stored = service.get_split(&record.id).await.unwrap();
    assert_eq!(share(&stored, "carol"), dec!(50.00));
}

#[tokio::test]
async fn test_amend_below_settled_is_rejected() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let result = service
        .amend_split(&record.id, amendment(dec!(10), "alice", vec![]), "alice")
        .await;
    match result {
        Err(LedgerError::Validation(ValidationError::AmountBelowSettled { new_total, settled })) => {
            assert_eq!(new_total, dec!(10));
            assert_eq!(settled, dec!(20));
        }
        other => panic!("expected AmountBelowSettled, got {:?}", other),
    }

    let stored = service.get_split(&record.id).await.unwrap();
    assert_eq!(stored.total_amount, dec!(50));
    assert_eq!(share(&stored, "carol"), dec!(30));
}

#[tokio::test]
async fn test_amend_keeps_pending_share_and_adds_participants() {
    let service = create_test_service();
    let record = half_settled(&service).await;
    service.request_manual_settlement(&record.id, "carol").await.unwrap();

    let amended = service
        .amend_split(
            &record.id,
            amendment(dec!(100), "alice", participants(&["bob", "carol", "dave", "erin"])),
            "bob",
        )
        .await
        .unwrap();
    assert_eq!(share(&amended, "bob"), dec!(20));
    assert_eq!(share(&amended, "carol"), dec!(30));
    assert_eq!(status(&amended, "carol"), SettlementStatus::PendingApproval);
    assert_eq!(share(&amended, "dave"), dec!(25));
    assert_eq!(share(&amended, "erin"), dec!(25));
    assert_eq!(
        amended.involved_user_ids,
        vec!["alice", "bob", "carol", "dave", "erin"]
    );

    let dave_splits = service.list_splits_for_user("dave").await.unwrap();
    assert_eq!(dave_splits.len(), 1);
}

#[tokio::test]
async fn test_amend_with_nobody_left_to_absorb_remainder() {
    let service = create_test_service();
    let record = half_settled(&service).await;
    service.request_manual_settlement(&record.id, "carol").await.unwrap();

    let result = service
        .amend_split(&record.id, amendment(dec!(80), "alice", vec![]), "alice")
        .await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::AmountMismatch { .. }))));

    let unchanged = service
        .amend_split(&record.id, amendment(dec!(50), "alice", vec![]), "alice")
        .await
        .unwrap();
    assert_eq!(unchanged.participants.len(), 2);
}

#[tokio::test]
async fn test_amend_new_payer_entry_is_settled() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let amended = service
        .amend_split(&record.id, amendment(dec!(50), "carol", vec![]), "alice")
        .await
        .unwrap();
    assert_eq!(amended.paid_by, "carol");
    assert_eq!(status(&amended, "carol"), SettlementStatus::Settled);
    assert!(amended.is_fully_settled());
}

#[tokio::test]
async fn test_amend_by_amount_must_match_remainder() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let mut change = amendment(
        dec!(70),
        "alice",
        vec![ParticipantInput::with_amount("carol", dec!(40))],
    );
    change.split_method = SplitMethod::ByAmount;
    let result = service.amend_split(&record.id, change.clone(), "alice").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::AmountMismatch { .. }))));

    change.participants = vec![ParticipantInput::with_amount("carol", dec!(50))];
    let amended = service.amend_split(&record.id, change, "alice").await.unwrap();
    assert_eq!(share(&amended, "carol"), dec!(50));
}

#[tokio::test]
async fn test_amend_requires_involved_actor() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let result = service
        .amend_split(&record.id, amendment(dec!(70), "alice", vec![]), "mallory")
        .await;
    assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));

    let result = service
        .amend_split("missing", amendment(dec!(70), "alice", vec![]), "alice")
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound { .. })));
}

#[tokio::test]
async fn test_amend_total_must_fit_currency_minor_unit() {
    let service = create_test_service();
    let record = half_settled(&service).await;

    let result = service
        .amend_split(&record.id, amendment(dec!(70.005), "alice", vec![]), "alice")
        .await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::InvalidInput(field, _))) if field == "total_amount"));

    let stored = service.get_split(&record.id).await.unwrap();
    assert_eq!(stored.total_amount, dec!(50));
    assert_eq!(share(&stored, "carol"), dec!(30));
}

#[tokio::test]
async fn test_amend_with_empty_list_keeps_stored_inputs_only() {
    let service = create_test_service();

    // ByAmount keeps no amounts, so explicit inputs are needed
    let record = half_settled(&service).await;
    let mut change = amendment(dec!(70), "alice", vec![]);
    change.split_method = SplitMethod::ByAmount;
    let result = service.amend_split(&record.id, change, "alice").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::MissingShareInput(id))) if id == "carol"));

    let record = service
        .create_split(new_split(
            dec!(100),
            SplitMethod::ByPercentage,
            "alice",
            vec![
                ParticipantInput::with_percentage("bob", dec!(40)),
                ParticipantInput::with_percentage("carol", dec!(60)),
            ],
            None,
        ))
        .await
        .unwrap();
    let mut change = amendment(dec!(200), "alice", vec![]);
    change.split_method = SplitMethod::ByPercentage;

    // untouched record: stored percentages still sum to 100
    let amended = service.amend_split(&record.id, change.clone(), "alice").await.unwrap();
    assert_eq!(share(&amended, "bob"), dec!(80));
    assert_eq!(share(&amended, "carol"), dec!(120));

    // once bob has settled, carol's 60 alone no longer covers the remainder
    service.request_manual_settlement(&record.id, "bob").await.unwrap();
    service.approve_settlement(&record.id, "bob", "alice").await.unwrap();
    let result = service.amend_split(&record.id, change, "alice").await;
    assert!(matches!(result, Err(LedgerError::Validation(ValidationError::PercentageMismatch { .. }))));

    let mut explicit = amendment(dec!(200), "alice", vec![ParticipantInput::with_percentage("carol", dec!(100))]);
    explicit.split_method = SplitMethod::ByPercentage;
    let amended = service.amend_split(&record.id, explicit, "alice").await.unwrap();
    assert_eq!(share(&amended, "bob"), dec!(80));
    assert_eq!(share(&amended, "carol"), dec!(120));
}
