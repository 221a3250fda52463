use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Per-user, per-currency internal balance. Never negative.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WalletBalance {
    pub user_id: String,
    #[schema(value_type = Object)]
    pub balances: BTreeMap<String, Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    pub fn empty(user_id: &str) -> Self {
        WalletBalance {
            user_id: user_id.to_string(),
            balances: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn balance(&self, currency: &str) -> Decimal {
        self.balances.get(currency).copied().unwrap_or(Decimal::ZERO)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
    SplitSettlement,
}

/// Append-only history entry written in the same atomic unit as the balance change.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    pub id: String,
    pub kind: WalletTransactionKind,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub currency: String,
    pub split_id: Option<String>,
    pub parties: Vec<String>,
    pub created_at: DateTime<Utc>,
}
