use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A friend the user may hold personal splits with.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Counterparty {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Positive: the counterparty owes the user. Negative: the user owes the counterparty.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct NetBalance {
    pub counterparty_id: String,
    pub counterparty_name: String,
    pub currency: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NetBalances {
    pub friend_balances: Vec<NetBalance>,
    pub group_balances: Vec<NetBalance>,
}

impl NetBalances {
    pub fn friend(&self, counterparty_id: &str, currency: &str) -> Option<Decimal> {
        self.friend_balances
            .iter()
            .find(|b| b.counterparty_id == counterparty_id && b.currency == currency)
            .map(|b| b.amount)
    }

    pub fn group(&self, group_id: &str, currency: &str) -> Option<Decimal> {
        self.group_balances
            .iter()
            .find(|b| b.counterparty_id == group_id && b.currency == currency)
            .map(|b| b.amount)
    }
}

/// An obligation waiting on the payer's approval.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingApproval {
    pub split_id: String,
    pub description: String,
    pub participant_id: String,
    pub participant_name: String,
    pub currency: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}
