use crate::core::errors::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};

const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "JPY", "KRW", "VND", "CLP", "ISK", "UGX", "XAF", "XOF", "PYG", "RWF",
];
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "KWD", "OMR", "JOD", "TND", "IQD", "LYD"];

/// Upper-cases and checks a three-letter ISO-4217 style code.
pub fn normalize_currency(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidCurrency(code.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Number of decimal places in the currency's minor unit.
pub fn minor_unit_scale(currency: &str) -> u32 {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency) {
        0
    } else if THREE_DECIMAL_CURRENCIES.contains(&currency) {
        3
    } else {
        2
    }
}

/// One minor unit of the currency, e.g. 0.01 for EUR.
pub fn tolerance(currency: &str) -> Decimal {
    Decimal::new(1, minor_unit_scale(currency))
}

pub fn truncate_to_minor(amount: Decimal, scale: u32) -> Decimal {
    amount.round_dp_with_strategy(scale, RoundingStrategy::ToZero)
}

pub fn round_to_minor(amount: Decimal, scale: u32) -> Decimal {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}
