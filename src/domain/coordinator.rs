//! Round coordination across all price engines.
//!
//! The coordinator owns the engines in registration order and nothing else.
//! Each round every engine advances exactly once; engines never read each
//! other's state, so the order only fixes the RNG consumption per engine and
//! the layout of the published snapshot.

use rand::Rng;
use rand::rngs::StdRng;
use tracing::info;

use super::error::WavetraderError;
use super::price_engine::PriceEngine;
use super::snapshot::PriceSnapshot;
use super::trade::{Order, TradeRequest};

/// One instrument's move over a round.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMove {
    pub instrument: String,
    pub previous_price: f64,
    pub price: f64,
    pub change: f64,
    pub volatility: f64,
}

impl PriceMove {
    /// Realized percentage change after flooring and rounding.
    pub fn change_pct(&self) -> f64 {
        if self.previous_price == 0.0 {
            return 0.0;
        }
        (self.price - self.previous_price) / self.previous_price * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundAdvance {
    pub snapshot: PriceSnapshot,
    pub moves: Vec<PriceMove>,
}

#[derive(Debug, Clone)]
pub struct RoundCoordinator<R = StdRng> {
    engines: Vec<PriceEngine<R>>,
}

impl<R> Default for RoundCoordinator<R> {
    fn default() -> Self {
        RoundCoordinator {
            engines: Vec::new(),
        }
    }
}

impl<R: Rng> RoundCoordinator<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: PriceEngine<R>) -> Result<(), WavetraderError> {
        if self.engine(engine.name()).is_some() {
            return Err(WavetraderError::construction(format!(
                "instrument {} registered twice",
                engine.name()
            )));
        }
        self.engines.push(engine);
        Ok(())
    }

    pub fn engines(&self) -> &[PriceEngine<R>] {
        &self.engines
    }

    pub fn engine(&self, instrument: &str) -> Option<&PriceEngine<R>> {
        self.engines.iter().find(|e| e.name() == instrument)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn price(&self, instrument: &str) -> Result<f64, WavetraderError> {
        self.engine(instrument)
            .map(PriceEngine::price)
            .ok_or_else(|| WavetraderError::UnknownInstrument {
                name: instrument.to_string(),
            })
    }

    /// Current prices labelled with `round`.
    pub fn snapshot(&self, round: u32) -> PriceSnapshot {
        PriceSnapshot::new(
            round,
            self.engines.iter().map(|e| (e.name(), e.price())),
        )
    }

    /// Advance every engine once and publish the snapshot for the next round.
    pub fn advance(&mut self, previous: &PriceSnapshot) -> RoundAdvance {
        let moves: Vec<PriceMove> = self
            .engines
            .iter_mut()
            .map(|engine| {
                let previous_price = engine.price();
                let change = engine.advance_round();
                PriceMove {
                    instrument: engine.name().to_string(),
                    previous_price,
                    price: engine.price(),
                    change,
                    volatility: engine.volatility(),
                }
            })
            .collect();
        let snapshot = self.snapshot(previous.round() + 1);
        info!(round = snapshot.round(), instruments = moves.len(), "round settled");
        RoundAdvance { snapshot, moves }
    }

    /// Price an order at the current market, enforcing its limit.
    pub fn quote(&self, order: &Order) -> Result<TradeRequest, WavetraderError> {
        let price = self.price(&order.instrument)?;
        order.priced(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::VolatilityTable;
    use crate::domain::instrument::InstrumentDef;
    use crate::domain::price_engine::PriceRange;
    use rand::SeedableRng;

    fn engine(name: &str, stage: &str, seed: u64) -> PriceEngine {
        let def = InstrumentDef::new(name, vec![stage.to_string()]);
        PriceEngine::new(
            &def,
            &VolatilityTable::default(),
            PriceRange::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn fixed(name: &str, price: f64) -> PriceEngine {
        let def = InstrumentDef::new(name, vec!["Mature".to_string()]);
        PriceEngine::with_state(
            &def,
            &VolatilityTable::default(),
            price,
            0.05,
            StdRng::seed_from_u64(1),
        )
        .unwrap()
    }

    fn coordinator() -> RoundCoordinator {
        let mut c = RoundCoordinator::new();
        c.register(engine("NVDA", "Growth", 1)).unwrap();
        c.register(engine("OXY", "Mature", 2)).unwrap();
        c.register(engine("FF", "Startup", 3)).unwrap();
        c
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut c = coordinator();
        let err = c.register(engine("OXY", "Decline", 9)).unwrap_err();
        assert!(matches!(err, WavetraderError::InvalidConstruction { .. }));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn snapshot_follows_registration_order() {
        let c = coordinator();
        let snap = c.snapshot(0);
        let names: Vec<&str> = snap.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["NVDA", "OXY", "FF"]);
        assert_eq!(snap.price("OXY"), Some(c.price("OXY").unwrap()));
    }

    #[test]
    fn advance_moves_every_engine_once() {
        let mut c = coordinator();
        let opening = c.snapshot(0);
        let advance = c.advance(&opening);
        assert_eq!(advance.snapshot.round(), 1);
        assert_eq!(advance.moves.len(), 3);
        for mv in &advance.moves {
            assert_eq!(opening.price(&mv.instrument), Some(mv.previous_price));
            assert_eq!(advance.snapshot.price(&mv.instrument), Some(mv.price));
        }
        let next = c.advance(&advance.snapshot);
        assert_eq!(next.snapshot.round(), 2);
    }

    #[test]
    fn engines_advance_independently() {
        let mut solo = RoundCoordinator::new();
        solo.register(engine("OXY", "Mature", 2)).unwrap();
        let mut full = coordinator();

        let mut solo_snap = solo.snapshot(0);
        let mut full_snap = full.snapshot(0);
        for _ in 0..25 {
            solo_snap = solo.advance(&solo_snap).snapshot;
            full_snap = full.advance(&full_snap).snapshot;
            assert_eq!(solo_snap.price("OXY"), full_snap.price("OXY"));
        }
    }

    #[test]
    fn unknown_instrument_price() {
        let c = coordinator();
        assert!(matches!(
            c.price("AAPL"),
            Err(WavetraderError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn quote_uses_current_price_and_limit() {
        let mut c = RoundCoordinator::new();
        c.register(fixed("OXY", 40.0)).unwrap();
        let order = Order {
            round: 1,
            holder: "P1".into(),
            instrument: "OXY".into(),
            quantity: 5,
            limit: Some(45.0),
        };
        let req = c.quote(&order).unwrap();
        assert_eq!(req.price, 40.0);

        let tight = Order {
            limit: Some(39.0),
            ..order.clone()
        };
        assert!(matches!(
            c.quote(&tight),
            Err(WavetraderError::LimitNotMet { .. })
        ));

        let missing = Order {
            instrument: "AAPL".into(),
            ..order
        };
        assert!(matches!(
            c.quote(&missing),
            Err(WavetraderError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn change_pct_reflects_rounded_prices() {
        let mv = PriceMove {
            instrument: "OXY".into(),
            previous_price: 40.0,
            price: 42.0,
            change: 0.0499,
            volatility: 0.05,
        };
        assert!((mv.change_pct() - 5.0).abs() < 1e-9);
    }
}
