use axum::{Json, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::errors::LedgerError;
use crate::core::models::{Counterparty, GroupRef, ParticipantInput, SplitMethod};

#[derive(Deserialize, ToSchema)]
pub struct CalculateSplitRequest {
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub split_method: SplitMethod,
    pub currency: String,
    pub participants: Vec<ParticipantInput>,
    #[serde(default)]
    pub paid_by: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct NetBalancesRequest {
    #[serde(default)]
    pub friends: Vec<Counterparty>,
    #[serde(default)]
    pub groups: Vec<GroupRef>,
}

#[derive(Deserialize, ToSchema)]
pub struct WalletAmountRequest {
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TransferFundsRequest {
    pub to_user_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub retryable: bool,
}

// Newtype wrapper for LedgerError to implement IntoResponse
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::InvalidState { .. } => StatusCode::CONFLICT,
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::StorageError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::LoggingError(_)
            | LedgerError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
