//! Divides a total among participants under a [`SplitMethod`].
//!
//! Pure functions only. `Equally` truncates every share to the currency's
//! minor unit and gives the whole remainder to the last participant.
//! `ByPercentage` rounds each share on its own; the result may drift from
//! the total by at most one minor unit and is rejected beyond that.

use crate::core::constants::PERCENTAGE_TOLERANCE;
use crate::core::errors::ValidationError;
use crate::core::models::{Obligation, ParticipantInput, SettlementStatus, SplitMethod};
use crate::core::money::{round_to_minor, truncate_to_minor, within_tolerance};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Splits a positive `total_amount`. The payer's entry, if present, is `Settled`.
pub fn calculate_split(
    total_amount: Decimal,
    method: SplitMethod,
    participants: &[ParticipantInput],
    payer_id: Option<&str>,
    scale: u32,
) -> Result<Vec<Obligation>, ValidationError> {
    if total_amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(total_amount));
    }
    split_amount(total_amount, method, participants, payer_id, scale)
}

/// Like [`calculate_split`] but accepts a zero total, as left over when an
/// amendment leaves nothing for the unsettled participants.
pub(crate) fn split_amount(
    total_amount: Decimal,
    method: SplitMethod,
    participants: &[ParticipantInput],
    payer_id: Option<&str>,
    scale: u32,
) -> Result<Vec<Obligation>, ValidationError> {
    if participants.is_empty() {
        return Err(ValidationError::EmptyParticipants);
    }
    let mut seen = HashSet::new();
    for p in participants {
        if !seen.insert(p.user_id.as_str()) {
            return Err(ValidationError::DuplicateParticipant(p.user_id.clone()));
        }
    }

    let shares: Vec<(Decimal, Option<Decimal>)> = match method {
        SplitMethod::Equally => split_equally(total_amount, participants.len(), scale)
            .into_iter()
            .map(|amount| (amount, None))
            .collect(),
        SplitMethod::ByAmount => split_by_amount(total_amount, participants, scale)?
            .into_iter()
            .map(|amount| (amount, None))
            .collect(),
        SplitMethod::ByPercentage => split_by_percentage(total_amount, participants, scale)?,
    };

    Ok(participants
        .iter()
        .zip(shares)
        .map(|(p, (amount_owed, percentage))| Obligation {
            user_id: p.user_id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            amount_owed,
            percentage,
            settlement_status: if payer_id == Some(p.user_id.as_str()) {
                SettlementStatus::Settled
            } else {
                SettlementStatus::Unsettled
            },
        })
        .collect())
}

fn split_equally(total_amount: Decimal, count: usize, scale: u32) -> Vec<Decimal> {
    let share = truncate_to_minor(total_amount / Decimal::from(count), scale);
    let mut shares = vec![share; count];
    let remainder = total_amount - share * Decimal::from(count);
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}

fn split_by_amount(
    total_amount: Decimal,
    participants: &[ParticipantInput],
    scale: u32,
) -> Result<Vec<Decimal>, ValidationError> {
    let mut amounts = Vec::with_capacity(participants.len());
    for p in participants {
        let amount = p
            .amount
            .ok_or_else(|| ValidationError::MissingShareInput(p.user_id.clone()))?;
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativeShare(p.user_id.clone()));
        }
        amounts.push(amount);
    }
    let sum: Decimal = amounts.iter().sum();
    if !within_tolerance(sum, total_amount, Decimal::new(1, scale)) {
        return Err(ValidationError::AmountMismatch {
            expected: total_amount,
            actual: sum,
        });
    }
    Ok(amounts)
}

fn split_by_percentage(
    total_amount: Decimal,
    participants: &[ParticipantInput],
    scale: u32,
) -> Result<Vec<(Decimal, Option<Decimal>)>, ValidationError> {
    let mut percentages = Vec::with_capacity(participants.len());
    for p in participants {
        let percentage = p
            .percentage
            .ok_or_else(|| ValidationError::MissingShareInput(p.user_id.clone()))?;
        if percentage < Decimal::ZERO {
            return Err(ValidationError::NegativeShare(p.user_id.clone()));
        }
        percentages.push(percentage);
    }
    let sum: Decimal = percentages.iter().sum();
    if !within_tolerance(sum, Decimal::ONE_HUNDRED, PERCENTAGE_TOLERANCE) {
        return Err(ValidationError::PercentageMismatch { actual: sum });
    }
    let shares: Vec<(Decimal, Option<Decimal>)> = percentages
        .into_iter()
        .map(|percentage| {
            let amount = round_to_minor(total_amount * percentage / Decimal::ONE_HUNDRED, scale);
            (amount, Some(percentage))
        })
        .collect();
    let allocated: Decimal = shares.iter().map(|(amount, _)| *amount).sum();
    if !within_tolerance(allocated, total_amount, Decimal::new(1, scale)) {
        return Err(ValidationError::AmountMismatch {
            expected: total_amount,
            actual: allocated,
        });
    }
    Ok(shares)
}
