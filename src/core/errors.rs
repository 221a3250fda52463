use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

/// Caller-input problems. Detected before any write and never partially applied.
#[derive(Error, Debug, Serialize)]
pub enum ValidationError {
    #[error("Split amounts sum to {actual} but the total is {expected}")]
    AmountMismatch { expected: Decimal, actual: Decimal },
    #[error("Split percentages sum to {actual}, expected 100")]
    PercentageMismatch { actual: Decimal },
    #[error("New total {new_total} is below the already settled {settled}")]
    AmountBelowSettled { new_total: Decimal, settled: Decimal },
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("A split needs at least one participant")]
    EmptyParticipants,
    #[error("Participant {0} appears more than once")]
    DuplicateParticipant(String),
    #[error("Participant {0} is missing an amount or percentage")]
    MissingShareInput(String),
    #[error("Participant {0} has a negative share")]
    NegativeShare(String),
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("Cannot transfer funds to self")]
    SelfTransfer,
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
}

#[derive(Error, Debug, Serialize)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Obligation of {participant_id} in split {split_id} is {actual}, expected {expected}")]
    InvalidState {
        split_id: String,
        participant_id: String,
        expected: String,
        actual: String,
    },
    #[error("User {actor_id} is not allowed to {action}")]
    Unauthorized { actor_id: String, action: String },
    #[error("Wallet of {user_id} holds {available} {currency}, needs {required}")]
    InsufficientFunds {
        user_id: String,
        currency: String,
        available: Decimal,
        required: Decimal,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },
    #[error("Store temporarily unavailable: {0}")]
    Transient(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl ValidationError {
    pub fn field(field: &str, description: &str) -> Self {
        ValidationError::InvalidInput(
            field.to_string(),
            FieldError {
                field: field.to_string(),
                title: format!("Invalid {}", field),
                description: description.to_string(),
            },
        )
    }
}

impl LedgerError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        LedgerError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized(actor_id: &str, action: &str) -> Self {
        LedgerError::Unauthorized {
            actor_id: actor_id.to_string(),
            action: action.to_string(),
        }
    }

    /// Only store-level failures are safe to replay unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }

    /// Short machine-readable tag used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::InvalidState { .. } => "invalid_state",
            LedgerError::Unauthorized { .. } => "authorization",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Transient(_) => "transient",
            LedgerError::StorageError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::LoggingError(_)
            | LedgerError::InternalServerError(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}
