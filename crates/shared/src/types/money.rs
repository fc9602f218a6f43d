//! Fixed-point rounding rules for money, quantities and unit costs.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Everything is a `rust_decimal::Decimal`, rounded with Banker's Rounding.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for money amounts (totals, paid, balances).
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for quantities (weights).
pub const QUANTITY_SCALE: u32 = 2;

/// Decimal places kept for per-unit costs.
pub const UNIT_COST_SCALE: u32 = 3;

/// Rounds a money amount to [`MONEY_SCALE`] places.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a quantity to [`QUANTITY_SCALE`] places.
#[must_use]
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a unit cost to [`UNIT_COST_SCALE`] places.
#[must_use]
pub fn round_unit_cost(cost: Decimal) -> Decimal {
    cost.round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Per-unit cost of `total_cost` spread over `quantity`, or zero when there is no quantity.
#[must_use]
pub fn unit_cost(total_cost: Decimal, quantity: Decimal) -> Decimal {
    if quantity > Decimal::ZERO {
        round_unit_cost(total_cost / quantity)
    } else {
        Decimal::ZERO
    }
}
