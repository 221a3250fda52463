use crate::core::calculator::split_amount;
use crate::core::errors::{LedgerError, ValidationError};
use crate::core::models::{ParticipantInput, SettlementStatus, SplitMethod, SplitRecord};
use crate::core::money::{minor_unit_scale, tolerance};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SplitAmendment {
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub paid_by: String,
    pub split_method: SplitMethod,
    /// Desired participants. Entries for already settled or pending shares are
    /// ignored; an empty list keeps the current unsettled participants.
    ///
    /// A kept participant carries only its stored percentage, never an amount.
    /// With an empty list, `ByAmount` therefore fails with `MissingShareInput`,
    /// and `ByPercentage` succeeds only when the kept percentages still sum
    /// to 100, i.e. when no share has left `Unsettled`. Pass explicit inputs
    /// in those cases.
    #[serde(default)]
    pub participants: Vec<ParticipantInput>,
}

/// Re-derives `record` under `amendment`, leaving every non-`Unsettled`
/// obligation exactly as it was.
pub fn amend_record(record: &mut SplitRecord, amendment: &SplitAmendment) -> Result<(), LedgerError> {
    if amendment.total_amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amendment.total_amount).into());
    }
    let scale = minor_unit_scale(&record.currency);
    let tol = tolerance(&record.currency);

    let (settled, unsettled): (Vec<_>, Vec<_>) = record
        .participants
        .iter()
        .cloned()
        .partition(|p| p.settlement_status != SettlementStatus::Unsettled);

    let settled_sum: Decimal = settled.iter().map(|p| p.amount_owed).sum();
    let remaining = amendment.total_amount - settled_sum;
    if remaining < -tol {
        return Err(ValidationError::AmountBelowSettled {
            new_total: amendment.total_amount,
            settled: settled_sum,
        }
        .into());
    }
    let remaining = remaining.max(Decimal::ZERO);

    let inputs: Vec<ParticipantInput> = if amendment.participants.is_empty() {
        unsettled.iter().map(|p| p.to_input()).collect()
    } else {
        amendment
            .participants
            .iter()
            .filter(|input| !settled.iter().any(|s| s.user_id == input.user_id))
            .cloned()
            .collect()
    };

    let recomputed = if inputs.is_empty() {
        if remaining > tol {
            return Err(ValidationError::AmountMismatch {
                expected: amendment.total_amount,
                actual: settled_sum,
            }
            .into());
        }
        Vec::new()
    } else {
        split_amount(remaining, amendment.split_method, &inputs, None, scale)?
    };

    let mut participants = settled;
    participants.extend(recomputed);
    if let Some(payer) = participants.iter_mut().find(|p| p.user_id == amendment.paid_by) {
        payer.settlement_status = SettlementStatus::Settled;
    }

    record.total_amount = amendment.total_amount;
    record.paid_by = amendment.paid_by.clone();
    record.split_method = amendment.split_method;
    record.participants = participants;
    record.refresh_involved_user_ids();
    record.updated_at = Utc::now();
    Ok(())
}
