//! Lifecycle of a single obligation inside a split record.
//!
//! ```text
//! Unsettled --SettleWithWallet--------> Settled
//! Unsettled --RequestManualSettlement--> PendingApproval --Approve--> Settled
//!                                        PendingApproval --Reject---> Unsettled
//! ```

use crate::core::errors::LedgerError;
use crate::core::models::{SettlementStatus, SplitRecord};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettlementEvent {
    SettleWithWallet,
    RequestManualSettlement,
    Approve,
    Reject,
}

/// Who may trigger an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementActor {
    OwingParticipant,
    Payer,
}

impl SettlementEvent {
    pub fn actor(self) -> SettlementActor {
        match self {
            SettlementEvent::SettleWithWallet | SettlementEvent::RequestManualSettlement => {
                SettlementActor::OwingParticipant
            }
            SettlementEvent::Approve | SettlementEvent::Reject => SettlementActor::Payer,
        }
    }

    pub fn required_state(self) -> SettlementStatus {
        match self {
            SettlementEvent::SettleWithWallet | SettlementEvent::RequestManualSettlement => {
                SettlementStatus::Unsettled
            }
            SettlementEvent::Approve | SettlementEvent::Reject => SettlementStatus::PendingApproval,
        }
    }

    pub fn action_name(self) -> &'static str {
        match self {
            SettlementEvent::SettleWithWallet => "settle with wallet",
            SettlementEvent::RequestManualSettlement => "request manual settlement",
            SettlementEvent::Approve => "approve settlement",
            SettlementEvent::Reject => "reject settlement",
        }
    }
}

/// Target state of `event` from `current`, or `None` when the table has no such edge.
pub fn next_state(current: SettlementStatus, event: SettlementEvent) -> Option<SettlementStatus> {
    match (current, event) {
        (SettlementStatus::Unsettled, SettlementEvent::SettleWithWallet) => Some(SettlementStatus::Settled),
        (SettlementStatus::Unsettled, SettlementEvent::RequestManualSettlement) => {
            Some(SettlementStatus::PendingApproval)
        }
        (SettlementStatus::PendingApproval, SettlementEvent::Approve) => Some(SettlementStatus::Settled),
        (SettlementStatus::PendingApproval, SettlementEvent::Reject) => Some(SettlementStatus::Unsettled),
        (SettlementStatus::Unsettled, SettlementEvent::Approve | SettlementEvent::Reject)
        | (
            SettlementStatus::PendingApproval,
            SettlementEvent::SettleWithWallet | SettlementEvent::RequestManualSettlement,
        )
        | (SettlementStatus::Settled, _) => None,
    }
}

/// Checks existence, actor and current state, then flips the obligation in place.
///
/// Always run against a record read inside the same atomic unit that writes it
/// back, so a retried or concurrent transition sees the state the first one left.
pub fn apply_transition(
    record: &mut SplitRecord,
    participant_id: &str,
    actor_id: &str,
    event: SettlementEvent,
) -> Result<SettlementStatus, LedgerError> {
    let paid_by = record.paid_by.clone();
    let split_id = record.id.clone();
    let obligation = record
        .participant_mut(participant_id)
        .ok_or_else(|| LedgerError::not_found("Obligation", &format!("{}/{}", split_id, participant_id)))?;

    let allowed = match event.actor() {
        SettlementActor::OwingParticipant => actor_id == participant_id,
        SettlementActor::Payer => actor_id == paid_by,
    };
    if !allowed {
        return Err(LedgerError::unauthorized(actor_id, event.action_name()));
    }

    let next = next_state(obligation.settlement_status, event).ok_or_else(|| LedgerError::InvalidState {
        split_id: split_id.clone(),
        participant_id: participant_id.to_string(),
        expected: event.required_state().to_string(),
        actual: obligation.settlement_status.to_string(),
    })?;

    obligation.settlement_status = next;
    Ok(next)
}
