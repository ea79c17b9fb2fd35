use rust_decimal::{Decimal, RoundingStrategy};

/// Round to 2 decimal places, half-up. Applied at every intermediate
/// monetary step, not just the final total, so recomputing a stored
/// amount never drifts.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to 1 decimal place, half-up. Used for displayed percentages.
pub fn round1(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to 4 decimal places, half-up. Intermediate precision for
/// percentage division before the final 1-decimal rounding.
pub fn round4(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// `rate` percent of `amount`, rounded to 2 decimals half-up.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    round2(amount * rate / Decimal::from(100))
}
