//! Per-holder cash and position ledger.

use std::collections::BTreeMap;
use tracing::debug;

use super::error::WavetraderError;
use super::position::{Position, Side};
use super::snapshot::PriceSnapshot;
use super::trade::{TradeFill, TradeRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionLedger {
    holder: String,
    cash: f64,
    initial_cash: f64,
    positions: BTreeMap<String, Position>,
}

impl PositionLedger {
    pub fn new(holder: impl Into<String>, initial_cash: f64) -> Result<Self, WavetraderError> {
        let holder = holder.into();
        if holder.trim().is_empty() {
            return Err(WavetraderError::construction("holder name must not be empty"));
        }
        if !initial_cash.is_finite() || initial_cash < 0.0 {
            return Err(WavetraderError::construction(format!(
                "initial cash for {holder} must be non-negative, got {initial_cash}"
            )));
        }
        Ok(PositionLedger {
            holder,
            cash: initial_cash,
            initial_cash,
            positions: BTreeMap::new(),
        })
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// Every record, including flat ones kept after a full close.
    pub fn positions(&self) -> impl Iterator<Item = (&str, &Position)> + '_ {
        self.positions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-flat positions only.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, &Position)> + '_ {
        self.positions().filter(|(_, p)| !p.is_flat())
    }

    pub fn quantity(&self, instrument: &str) -> i64 {
        self.position(instrument).map_or(0, |p| p.quantity)
    }

    pub fn average_cost(&self, instrument: &str) -> f64 {
        self.position(instrument).map_or(0.0, Position::average_cost)
    }

    pub fn realized_pnl(&self, instrument: &str) -> f64 {
        self.position(instrument).map_or(0.0, |p| p.realized_pnl)
    }

    pub fn unrealized_pnl(&self, instrument: &str, price: f64) -> f64 {
        self.position(instrument)
            .map_or(0.0, |p| p.unrealized_pnl(price))
    }

    pub fn buy(
        &mut self,
        instrument: &str,
        quantity: i64,
        price: f64,
    ) -> Result<TradeFill, WavetraderError> {
        validate_trade(instrument, quantity, price)?;
        let cost = quantity as f64 * price;
        if cost > self.cash {
            return Err(WavetraderError::InsufficientFunds {
                holder: self.holder.clone(),
                instrument: instrument.to_string(),
                cost,
                cash: self.cash,
            });
        }
        let fill = self.fill(instrument, Side::Buy, quantity, price)?;
        self.cash -= cost;
        Ok(fill)
    }

    /// Sells are never blocked; selling more than is held opens a short.
    pub fn sell(
        &mut self,
        instrument: &str,
        quantity: i64,
        price: f64,
    ) -> Result<TradeFill, WavetraderError> {
        validate_trade(instrument, quantity, price)?;
        let fill = self.fill(instrument, Side::Sell, quantity, price)?;
        self.cash += quantity as f64 * price;
        Ok(fill)
    }

    /// Dispatch a signed request to [`buy`](Self::buy) or [`sell`](Self::sell).
    pub fn execute(&mut self, request: &TradeRequest) -> Result<TradeFill, WavetraderError> {
        if request.holder != self.holder {
            return Err(WavetraderError::UnknownHolder {
                name: request.holder.clone(),
            });
        }
        match request.side() {
            Some(Side::Buy) => self.buy(&request.instrument, request.quantity, request.price),
            Some(Side::Sell) => {
                let quantity = request.quantity.checked_neg().ok_or_else(|| {
                    WavetraderError::InvalidTrade {
                        reason: format!(
                            "sell quantity {} for {} is out of range",
                            request.quantity, request.instrument
                        ),
                    }
                })?;
                self.sell(&request.instrument, quantity, request.price)
            }
            None => Err(WavetraderError::InvalidTrade {
                reason: format!("zero quantity for {}", request.instrument),
            }),
        }
    }

    /// Cash plus the signed value of every non-flat position.
    pub fn net_worth(&self, snapshot: &PriceSnapshot) -> Result<f64, WavetraderError> {
        let mut total = self.cash;
        for (instrument, position) in self.holdings() {
            let price = snapshot.price(instrument).ok_or_else(|| {
                WavetraderError::MissingPriceInSnapshot {
                    instrument: instrument.to_string(),
                }
            })?;
            total += position.market_value(price);
        }
        Ok(total)
    }

    /// Nothing is recorded when the position rejects the trade.
    fn fill(
        &mut self,
        instrument: &str,
        side: Side,
        quantity: i64,
        price: f64,
    ) -> Result<TradeFill, WavetraderError> {
        let mut position = self.positions.get(instrument).cloned().unwrap_or_default();
        let allocation = position.apply(side, quantity, price)?;
        debug!(
            holder = %self.holder,
            instrument,
            ?side,
            quantity,
            price,
            covered = allocation.covered,
            opened = allocation.opened,
            position = position.quantity,
            "trade filled"
        );
        self.positions.insert(instrument.to_string(), position);
        Ok(TradeFill {
            holder: self.holder.clone(),
            instrument: instrument.to_string(),
            side,
            quantity,
            price,
            covered: allocation.covered,
            opened: allocation.opened,
            realized_pnl: allocation.realized_pnl,
        })
    }
}

fn validate_trade(instrument: &str, quantity: i64, price: f64) -> Result<(), WavetraderError> {
    if quantity <= 0 {
        return Err(WavetraderError::InvalidTrade {
            reason: format!("quantity for {instrument} must be positive, got {quantity}"),
        });
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(WavetraderError::InvalidTrade {
            reason: format!("price for {instrument} must be positive, got {price}"),
        });
    }
    Ok(())
}
