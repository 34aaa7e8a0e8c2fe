//! Money amounts as every backend stores them: cents, bounded magnitude

use rust_decimal::{Decimal, RoundingStrategy};

use super::result::{Error, Result};

/// Digits kept after the decimal point
pub const MONEY_SCALE: u32 = 2;

/// Amounts must stay strictly below this magnitude (DECIMAL(14, 2))
const MONEY_LIMIT: i64 = 1_000_000_000_000;

/// Round to cents, half away from zero; out-of-range amounts are rejected
pub fn normalize_money(amount: Decimal) -> Result<Decimal> {
    let rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.abs() >= Decimal::from(MONEY_LIMIT) {
        return Err(Error::validation(format!("amount {} is out of range", amount)));
    }
    Ok(rounded)
}

pub fn normalize_optional_money(amount: Option<Decimal>) -> Result<Option<Decimal>> {
    amount.map(normalize_money).transpose()
}
