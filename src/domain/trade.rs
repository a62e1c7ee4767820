//! Trade requests, scheduled orders and fill records.

use super::error::WavetraderError;
use super::position::Side;

/// A priced request against one holder's ledger. Positive quantity buys,
/// negative sells.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub holder: String,
    pub instrument: String,
    pub quantity: i64,
    pub price: f64,
}

impl TradeRequest {
    pub fn side(&self) -> Option<Side> {
        Side::of(self.quantity)
    }
}

/// An unpriced request scheduled for a given round. The price is taken from
/// the market when the order is submitted.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Order {
    pub round: u32,
    pub holder: String,
    pub instrument: String,
    pub quantity: i64,
    #[serde(default)]
    pub limit: Option<f64>,
}

impl Order {
    /// Limit check: buys need `price <= limit`, sells need `price >= limit`.
    pub fn accepts(&self, price: f64) -> bool {
        match (self.limit, Side::of(self.quantity)) {
            (None, _) | (_, None) => true,
            (Some(limit), Some(Side::Buy)) => price <= limit,
            (Some(limit), Some(Side::Sell)) => price >= limit,
        }
    }

    pub fn priced(&self, price: f64) -> Result<TradeRequest, WavetraderError> {
        if let Some(limit) = self.limit {
            if !self.accepts(price) {
                return Err(WavetraderError::LimitNotMet {
                    instrument: self.instrument.clone(),
                    price,
                    limit,
                });
            }
        }
        Ok(TradeRequest {
            holder: self.holder.clone(),
            instrument: self.instrument.clone(),
            quantity: self.quantity,
            price,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeFill {
    pub holder: String,
    pub instrument: String,
    pub side: Side,
    pub quantity: i64,
    pub price: f64,
    pub covered: i64,
    pub opened: i64,
    pub realized_pnl: f64,
}
