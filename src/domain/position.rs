//! Signed position and cost-basis accounting for one instrument.
//!
//! A trade against an opposite-direction position first covers it at the
//! existing average cost. Whatever is left opens a fresh position at the trade
//! price, so a closed short's basis never blends into a new long's (and vice
//! versa).

use super::error::WavetraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side of a signed quantity; `None` for zero.
    pub fn of(quantity: i64) -> Option<Side> {
        match quantity.signum() {
            1 => Some(Side::Buy),
            -1 => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

/// How a single trade landed on a position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Allocation {
    /// Shares that closed part of an opposite position.
    pub covered: i64,
    /// Shares that opened or extended a position in the trade's direction.
    pub opened: i64,
    /// Profit realized by the covered shares.
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub quantity: i64,
    pub cost_basis_total: f64,
    pub cost_basis_quantity: i64,
    /// Cumulative profit realized by covers; survives the position going flat.
    pub realized_pnl: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn average_cost(&self) -> f64 {
        if self.cost_basis_quantity == 0 {
            return 0.0;
        }
        self.cost_basis_total / self.cost_basis_quantity.unsigned_abs() as f64
    }

    /// Signed value at `price`; negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.average_cost())
    }

    /// Apply `quantity` shares (> 0) on `side` at `price`. Fails without
    /// touching the position when the resulting quantity would overflow.
    pub(crate) fn apply(
        &mut self,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> Result<Allocation, WavetraderError> {
        let sign = side.sign();
        let mut next = self.clone();
        let mut allocation = Allocation::default();

        if next.quantity.signum() == -sign {
            // cover <= quantity, so the cast back to i64 is lossless
            let cover = (quantity as u64).min(next.quantity.unsigned_abs()) as i64;
            let average = next.average_cost();
            let realized = (price - average) * cover as f64 * next.quantity.signum() as f64;

            next.cost_basis_total -= average * cover as f64;
            next.cost_basis_quantity += cover * sign;
            next.quantity += cover * sign;
            next.realized_pnl += realized;
            if next.quantity == 0 {
                next.cost_basis_total = 0.0;
                next.cost_basis_quantity = 0;
            }

            allocation.covered = cover;
            allocation.realized_pnl = realized;
        }

        let remaining = quantity - allocation.covered;
        if remaining > 0 {
            let delta = remaining * sign;
            let overflow = || WavetraderError::InvalidTrade {
                reason: format!("position of {} shares overflows by {delta}", self.quantity),
            };
            next.quantity = next.quantity.checked_add(delta).ok_or_else(overflow)?;
            next.cost_basis_quantity = next
                .cost_basis_quantity
                .checked_add(delta)
                .ok_or_else(overflow)?;
            next.cost_basis_total += remaining as f64 * price;
            allocation.opened = remaining;
        }

        *self = next;
        Ok(allocation)
    }
}
