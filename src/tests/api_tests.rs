use crate::api::handlers::{AppState, SharedState, create_split, get_app_logs, get_split, list_splits_for_user};
use crate::api::models::{ApiError, ErrorResponse};
use crate::auth::jwt::{Claims, JwtService};
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::SplitMethod;
use crate::tests::{create_test_service, new_split, participants};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn test_state() -> SharedState {
    Arc::new(AppState {
        service: create_test_service(),
        jwt: JwtService::new("test-secret".to_string()),
    })
}

fn acting(user_id: &str) -> Extension<Claims> {
    Extension(Claims {
        sub: user_id.to_string(),
        exp: usize::MAX,
    })
}

fn expect_forbidden<T>(result: Result<T, ApiError>) {
    match result {
        Ok(_) => panic!("expected the call to be refused"),
        Err(err) => assert_eq!(err.status(), StatusCode::FORBIDDEN),
    }
}

#[test]
fn test_error_status_mapping() {
    let cases = vec![
        (LedgerError::from(ValidationError::EmptyParticipants), StatusCode::BAD_REQUEST),
        (LedgerError::unauthorized("bob", "approve settlement"), StatusCode::FORBIDDEN),
        (LedgerError::not_found("Split", "s1"), StatusCode::NOT_FOUND),
        (
            LedgerError::InvalidState {
                split_id: "s1".to_string(),
                participant_id: "bob".to_string(),
                expected: "PENDING_APPROVAL".to_string(),
                actual: "SETTLED".to_string(),
            },
            StatusCode::CONFLICT,
        ),
        (
            LedgerError::InsufficientFunds {
                user_id: "bob".to_string(),
                currency: "EUR".to_string(),
                available: dec!(1),
                required: dec!(2),
            },
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (LedgerError::Transient("busy".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (LedgerError::StorageError("disk".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
        assert_eq!(ApiError(err).status(), expected);
    }
}

#[tokio::test]
async fn test_error_response_body() {
    let response = ApiError(LedgerError::Transient("busy".to_string())).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.kind, "transient");
    assert!(body.retryable);
    assert!(body.error.contains("busy"));
}

#[test]
fn test_jwt_round_trip() {
    let jwt = JwtService::new("test-secret".to_string());
    let token = jwt.generate_token("alice", 3600).unwrap();
    let claims = jwt.validate_token(&token).unwrap();
    assert_eq!(claims.sub, "alice");
}

#[test]
fn test_jwt_rejects_foreign_or_garbage_tokens() {
    let issuer = JwtService::new("other-secret".to_string());
    let token = issuer.generate_token("alice", 3600).unwrap();

    let jwt = JwtService::new("test-secret".to_string());
    assert!(matches!(jwt.validate_token(&token), Err(LedgerError::Unauthorized { .. })));
    assert!(matches!(jwt.validate_token("not-a-token"), Err(LedgerError::Unauthorized { .. })));
}

#[tokio::test]
async fn test_create_split_requires_caller_to_take_part() {
    let state = test_state();
    let split = || new_split(dec!(30), SplitMethod::Equally, "alice", participants(&["alice", "bob"]), None);

    expect_forbidden(create_split(State(state.clone()), acting("mallory"), Json(split())).await);
    assert!(state.service.list_splits_for_user("alice").await.unwrap().is_empty());

    let (status, Json(record)) = create_split(State(state.clone()), acting("bob"), Json(split()))
        .await
        .unwrap_or_else(|e| panic!("create refused: {}", e.0));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record.paid_by, "alice");
}

#[tokio::test]
async fn test_split_reads_are_limited_to_involved_users() {
    let state = test_state();
    let record = state
        .service
        .create_split(new_split(dec!(30), SplitMethod::Equally, "alice", participants(&["alice", "bob"]), None))
        .await
        .unwrap();

    expect_forbidden(list_splits_for_user(State(state.clone()), acting("mallory"), Path("alice".to_string())).await);
    let Json(listed) = list_splits_for_user(State(state.clone()), acting("alice"), Path("alice".to_string()))
        .await
        .unwrap_or_else(|e| panic!("list refused: {}", e.0));
    assert_eq!(listed.len(), 1);

    expect_forbidden(get_split(State(state.clone()), acting("mallory"), Path(record.id.clone())).await);
    let Json(fetched) = get_split(State(state.clone()), acting("bob"), Path(record.id.clone()))
        .await
        .unwrap_or_else(|e| panic!("get refused: {}", e.0));
    assert_eq!(fetched.id, record.id);
}

#[tokio::test]
async fn test_audit_log_shows_only_callers_entries() {
    let state = test_state();
    state.service.deposit("alice", dec!(10), "EUR").await.unwrap();
    state.service.deposit("bob", dec!(5), "EUR").await.unwrap();

    let Json(logs) = get_app_logs(State(state.clone()), acting("bob"))
        .await
        .unwrap_or_else(|e| panic!("logs refused: {}", e.0));
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id.as_deref(), Some("bob"));

    let Json(logs) = get_app_logs(State(state), acting("mallory"))
        .await
        .unwrap_or_else(|e| panic!("logs refused: {}", e.0));
    assert!(logs.is_empty());
}
