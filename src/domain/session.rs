//! Simulation session: the trade, settle, value loop over a fixed number of
//! rounds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::cmp::Ordering;
use tracing::{info, warn};

use super::category::VolatilityTable;
use super::coordinator::{PriceMove, RoundCoordinator};
use super::error::WavetraderError;
use super::instrument::{InstrumentDef, validate_universe};
use super::ledger::PositionLedger;
use super::price_engine::{PriceEngine, PriceRange};
use super::snapshot::PriceSnapshot;
use super::trade::{Order, TradeFill};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Master seed; a fresh entropy seed is used when absent.
    pub seed: Option<u64>,
    pub rounds: u32,
    /// Number of instruments drawn from the universe; all when absent.
    pub active_instruments: Option<usize>,
    pub initial_cash: f64,
    pub holders: Vec<String>,
    pub price_range: PriceRange,
    pub volatility: VolatilityTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: None,
            rounds: 3,
            active_instruments: None,
            initial_cash: 50_000.0,
            holders: vec!["Player 1".to_string(), "Player 2".to_string()],
            price_range: PriceRange::default(),
            volatility: VolatilityTable::default(),
        }
    }
}

/// An order that was refused, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub order: Order,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub holder: String,
    pub cash: f64,
    pub net_worth: f64,
    /// Change against the previous round's net worth.
    pub change: f64,
}

impl Valuation {
    pub fn change_pct(&self) -> f64 {
        let previous = self.net_worth - self.change;
        if previous == 0.0 {
            return 0.0;
        }
        self.change / previous * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub round: u32,
    pub fills: Vec<TradeFill>,
    pub rejections: Vec<Rejection>,
    pub moves: Vec<PriceMove>,
    pub snapshot: PriceSnapshot,
    pub valuations: Vec<Valuation>,
}

#[derive(Debug, Clone)]
pub struct SessionResult {
    pub opening: PriceSnapshot,
    pub opening_valuations: Vec<Valuation>,
    pub rounds: Vec<RoundRecord>,
    pub ledgers: Vec<PositionLedger>,
    /// Orders whose round fell outside the session.
    pub unscheduled: usize,
}

impl SessionResult {
    pub fn final_snapshot(&self) -> &PriceSnapshot {
        self.rounds
            .last()
            .map(|r| &r.snapshot)
            .unwrap_or(&self.opening)
    }

    /// Final valuations, richest first.
    pub fn standings(&self) -> Vec<Valuation> {
        let mut standings = self
            .rounds
            .last()
            .map(|r| r.valuations.clone())
            .unwrap_or_else(|| self.opening_valuations.clone());
        standings.sort_by(|a, b| {
            b.net_worth
                .partial_cmp(&a.net_worth)
                .unwrap_or(Ordering::Equal)
        });
        standings
    }
}

pub struct Session {
    coordinator: RoundCoordinator,
    ledgers: Vec<PositionLedger>,
    snapshot: PriceSnapshot,
    last_worth: Vec<f64>,
    rounds: u32,
}

impl Session {
    pub fn new(
        config: &SimulationConfig,
        universe: &[InstrumentDef],
    ) -> Result<Self, WavetraderError> {
        validate_universe(universe)?;
        if universe.is_empty() {
            return Err(WavetraderError::construction("instrument universe is empty"));
        }
        if config.holders.is_empty() {
            return Err(WavetraderError::construction("at least one holder is required"));
        }
        if config.active_instruments == Some(0) {
            return Err(WavetraderError::construction(
                "active_instruments must be at least 1",
            ));
        }

        let mut master = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let active = select_active(universe, config.active_instruments, &mut master);
        let mut coordinator = RoundCoordinator::new();
        for def in active {
            let rng = StdRng::seed_from_u64(master.next_u64());
            coordinator.register(PriceEngine::new(
                def,
                &config.volatility,
                config.price_range,
                rng,
            )?)?;
        }

        let mut ledgers: Vec<PositionLedger> = Vec::with_capacity(config.holders.len());
        for holder in &config.holders {
            if ledgers.iter().any(|l| l.holder() == holder) {
                return Err(WavetraderError::construction(format!(
                    "duplicate holder: {holder}"
                )));
            }
            ledgers.push(PositionLedger::new(holder.clone(), config.initial_cash)?);
        }

        let snapshot = coordinator.snapshot(0);
        info!(
            instruments = coordinator.len(),
            holders = ledgers.len(),
            rounds = config.rounds,
            "session initialised"
        );
        Ok(Session {
            coordinator,
            last_worth: vec![config.initial_cash; ledgers.len()],
            ledgers,
            snapshot,
            rounds: config.rounds,
        })
    }

    pub fn coordinator(&self) -> &RoundCoordinator {
        &self.coordinator
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    pub fn ledgers(&self) -> &[PositionLedger] {
        &self.ledgers
    }

    pub fn ledger(&self, holder: &str) -> Option<&PositionLedger> {
        self.ledgers.iter().find(|l| l.holder() == holder)
    }

    /// Execute one order at the current price.
    pub fn submit(&mut self, order: &Order) -> Result<TradeFill, WavetraderError> {
        let ledger = self
            .ledgers
            .iter_mut()
            .find(|l| l.holder() == order.holder)
            .ok_or_else(|| WavetraderError::UnknownHolder {
                name: order.holder.clone(),
            })?;
        let request = self.coordinator.quote(order)?;
        ledger.execute(&request)
    }

    /// Value every holder against the current snapshot.
    pub fn valuations(&self) -> Result<Vec<Valuation>, WavetraderError> {
        self.ledgers
            .iter()
            .zip(&self.last_worth)
            .map(|(ledger, last)| {
                let net_worth = ledger.net_worth(&self.snapshot)?;
                Ok(Valuation {
                    holder: ledger.holder().to_string(),
                    cash: ledger.cash(),
                    net_worth,
                    change: net_worth - last,
                })
            })
            .collect()
    }

    /// Advance prices one round and value every holder at the new prices.
    pub fn settle(&mut self) -> Result<(Vec<PriceMove>, Vec<Valuation>), WavetraderError> {
        let advance = self.coordinator.advance(&self.snapshot);
        self.snapshot = advance.snapshot;
        let valuations = self.valuations()?;
        self.last_worth = valuations.iter().map(|v| v.net_worth).collect();
        Ok((advance.moves, valuations))
    }

    pub fn run(mut self, orders: &[Order]) -> Result<SessionResult, WavetraderError> {
        let opening = self.snapshot.clone();
        let opening_valuations = self.valuations()?;
        self.last_worth = opening_valuations.iter().map(|v| v.net_worth).collect();

        let unscheduled = orders
            .iter()
            .filter(|o| o.round == 0 || o.round > self.rounds)
            .count();
        if unscheduled > 0 {
            warn!(unscheduled, rounds = self.rounds, "orders outside the session skipped");
        }

        let mut records = Vec::with_capacity(self.rounds as usize);
        for round in 1..=self.rounds {
            let mut fills = Vec::new();
            let mut rejections = Vec::new();
            for order in orders.iter().filter(|o| o.round == round) {
                match self.submit(order) {
                    Ok(fill) => fills.push(fill),
                    Err(e) if e.is_trade_rejection() => {
                        warn!(
                            round,
                            holder = %order.holder,
                            instrument = %order.instrument,
                            error = %e,
                            "order rejected"
                        );
                        rejections.push(Rejection {
                            order: order.clone(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            let (moves, valuations) = self.settle()?;
            records.push(RoundRecord {
                round,
                fills,
                rejections,
                moves,
                snapshot: self.snapshot.clone(),
                valuations,
            });
        }

        Ok(SessionResult {
            opening,
            opening_valuations,
            rounds: records,
            ledgers: self.ledgers,
            unscheduled,
        })
    }
}

/// Shuffle the universe and keep `count` instruments; all when `None` or
/// larger than the universe.
pub fn select_active<'a, R: RngCore>(
    universe: &'a [InstrumentDef],
    count: Option<usize>,
    rng: &mut R,
) -> Vec<&'a InstrumentDef> {
    let mut picked: Vec<&InstrumentDef> = universe.iter().collect();
    picked.shuffle(rng);
    if let Some(n) = count {
        picked.truncate(n);
    }
    picked
}
