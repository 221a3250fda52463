use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum SplitMethod {
    Equally,
    ByAmount,
    ByPercentage,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum SettlementStatus {
    Unsettled,
    PendingApproval,
    Settled,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SettlementStatus::Unsettled => "UNSETTLED",
            SettlementStatus::PendingApproval => "PENDING_APPROVAL",
            SettlementStatus::Settled => "SETTLED",
        };
        write!(f, "{}", s)
    }
}

/// Caller-supplied participant for a split. `amount` is read under
/// `ByAmount`, `percentage` under `ByPercentage`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantInput {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub percentage: Option<Decimal>,
}

impl ParticipantInput {
    pub fn new(user_id: &str) -> Self {
        ParticipantInput {
            user_id: user_id.to_string(),
            name: String::new(),
            email: String::new(),
            amount: None,
            percentage: None,
        }
    }

    pub fn with_amount(user_id: &str, amount: Decimal) -> Self {
        ParticipantInput {
            amount: Some(amount),
            ..ParticipantInput::new(user_id)
        }
    }

    pub fn with_percentage(user_id: &str, percentage: Decimal) -> Self {
        ParticipantInput {
            percentage: Some(percentage),
            ..ParticipantInput::new(user_id)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Obligation {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[schema(value_type = String)]
    pub amount_owed: Decimal,
    #[schema(value_type = Option<String>)]
    pub percentage: Option<Decimal>,
    pub settlement_status: SettlementStatus,
}

impl Obligation {
    pub fn is_settled(&self) -> bool {
        self.settlement_status == SettlementStatus::Settled
    }

    pub fn to_input(&self) -> ParticipantInput {
        ParticipantInput {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            amount: None,
            percentage: self.percentage,
        }
    }
}

/// Reference to the expense a split was derived from.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseRef {
    pub id: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SplitRecord {
    pub id: String,
    pub original_expense_id: String,
    pub original_expense_description: String,
    pub currency: String,
    pub split_method: SplitMethod,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub paid_by: String,
    pub participants: Vec<Obligation>,
    pub involved_user_ids: Vec<String>,
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SplitRecord {
    pub fn participant(&self, user_id: &str) -> Option<&Obligation> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: &str) -> Option<&mut Obligation> {
        self.participants.iter_mut().find(|p| p.user_id == user_id)
    }

    /// `{paid_by} ∪ {participant ids}`, sorted for stable storage.
    pub fn derive_involved_user_ids(&self) -> Vec<String> {
        let mut ids: BTreeSet<String> = self.participants.iter().map(|p| p.user_id.clone()).collect();
        ids.insert(self.paid_by.clone());
        ids.into_iter().collect()
    }

    pub fn refresh_involved_user_ids(&mut self) {
        self.involved_user_ids = self.derive_involved_user_ids();
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.paid_by == user_id || self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_fully_settled(&self) -> bool {
        self.participants.iter().all(Obligation::is_settled)
    }

    /// Sum of every share that has not reached `Settled`.
    pub fn outstanding_amount(&self) -> Decimal {
        self.participants
            .iter()
            .filter(|p| !p.is_settled())
            .map(|p| p.amount_owed)
            .sum()
    }

    pub fn allocated_amount(&self) -> Decimal {
        self.participants.iter().map(|p| p.amount_owed).sum()
    }
}
