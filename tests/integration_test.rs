//! Integration tests for the price walk, the ledgers and full sessions.
//!
//! Tests cover:
//! - Cost-basis scenarios through the public ledger API
//! - Price-walk bounds and seeded determinism
//! - Coordinator order independence
//! - Full sessions over a mock data port: rejections, limits, valuation

mod common;

use approx::assert_relative_eq;
use common::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wavetrader::domain::category::{Category, VolatilityTable};
use wavetrader::domain::coordinator::RoundCoordinator;
use wavetrader::domain::error::WavetraderError;
use wavetrader::domain::ledger::PositionLedger;
use wavetrader::domain::price_engine::{PRICE_FLOOR, PriceEngine, PriceRange};
use wavetrader::domain::session::{Session, SessionResult, SimulationConfig};
use wavetrader::domain::snapshot::PriceSnapshot;
use wavetrader::ports::data_port::DataPort;

mod ledger_scenarios {
    use super::*;

    #[test]
    fn buy_then_sell_at_same_price_restores_cash() {
        let mut ledger = PositionLedger::new("Alice", 10_000.0).unwrap();
        ledger.buy("NVDA", 37, 123.45).unwrap();
        ledger.sell("NVDA", 37, 123.45).unwrap();

        assert_relative_eq!(ledger.cash(), 10_000.0, epsilon = 1e-9);
        let pos = ledger.position("NVDA").unwrap();
        assert!(pos.is_flat());
        assert_eq!(pos.cost_basis_total, 0.0);
        assert_eq!(pos.cost_basis_quantity, 0);
    }

    #[test]
    fn partial_cover_of_short_keeps_average() {
        let mut ledger = PositionLedger::new("Alice", 0.0).unwrap();
        ledger.sell("OXY", 10, 50.0).unwrap();
        assert_relative_eq!(ledger.average_cost("OXY"), 50.0);

        ledger.buy("OXY", 4, 40.0).unwrap();
        assert_eq!(ledger.quantity("OXY"), -6);
        assert_relative_eq!(ledger.average_cost("OXY"), 50.0);
        assert_relative_eq!(ledger.cash(), 500.0 - 160.0);
        assert_relative_eq!(ledger.realized_pnl("OXY"), 40.0);
    }

    #[test]
    fn buying_past_a_short_opens_fresh_long() {
        let mut ledger = PositionLedger::new("Alice", 1_000.0).unwrap();
        ledger.sell("FF", 5, 20.0).unwrap();

        let fill = ledger.buy("FF", 8, 25.0).unwrap();
        assert_eq!(fill.covered, 5);
        assert_eq!(fill.opened, 3);
        assert!(fill.realized_pnl < 0.0);
        assert_eq!(ledger.quantity("FF"), 3);
        assert_relative_eq!(ledger.average_cost("FF"), 25.0);
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let mut ledger = PositionLedger::new("Alice", 100.0).unwrap();
        let before = ledger.clone();

        let err = ledger.buy("VNK", 10, 11.0).unwrap_err();
        assert!(matches!(err, WavetraderError::InsufficientFunds { .. }));
        assert_eq!(ledger, before);
    }

    #[test]
    fn net_worth_requires_every_held_price() {
        let mut ledger = PositionLedger::new("Alice", 1_000.0).unwrap();
        ledger.buy("NVDA", 2, 100.0).unwrap();
        ledger.sell("OXY", 3, 10.0).unwrap();

        let full = PriceSnapshot::new(1, [("NVDA", 110.0), ("OXY", 12.0)]);
        assert_relative_eq!(
            ledger.net_worth(&full).unwrap(),
            1_000.0 - 200.0 + 30.0 + 220.0 - 36.0
        );

        let partial = PriceSnapshot::new(1, [("NVDA", 110.0)]);
        assert!(matches!(
            ledger.net_worth(&partial),
            Err(WavetraderError::MissingPriceInSnapshot { .. })
        ));
    }
}

mod price_walk {
    use super::*;

    fn engine(tags: &[&str], seed: u64) -> PriceEngine {
        PriceEngine::new(
            &make_instrument("TEST", tags),
            &VolatilityTable::default(),
            PriceRange::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn every_category_stays_within_bounds() {
        for tags in [
            &["Startup"][..],
            &["Growth"],
            &["Mature"],
            &["Decline"],
            &["Commodities"],
            &["Growth", "Decline"],
        ] {
            let mut e = engine(tags, 17);
            let band = e.band();
            for _ in 0..2_000 {
                let change = e.advance_round();
                assert!((-1.0..=1.0).contains(&change));
                assert!(e.price() >= PRICE_FLOOR);
                assert!(band.contains(e.volatility()), "{tags:?}: {}", e.volatility());
            }
        }
    }

    #[test]
    fn identical_seeds_give_identical_trajectories() {
        let mut a = engine(&["Startup"], 2024);
        let mut b = engine(&["Startup"], 2024);
        for _ in 0..500 {
            assert_eq!(a.advance_round().to_bits(), b.advance_round().to_bits());
            assert_eq!(a.price().to_bits(), b.price().to_bits());
            assert_eq!(a.volatility().to_bits(), b.volatility().to_bits());
        }
    }

    #[test]
    fn category_resolved_from_first_stage_tag() {
        assert_eq!(engine(&["Asia", "Mature", "Growth"], 1).category(), Category::Mature);
        assert_eq!(engine(&["Commodities"], 1).category(), Category::Unclassified);
    }

    #[test]
    fn preview_does_not_move_the_engine() {
        let e = engine(&["Growth"], 5);
        let (price, volatility) = (e.price(), e.volatility());
        let steps = e.preview(20, StdRng::seed_from_u64(6));
        assert_eq!(steps.len(), 20);
        assert_eq!(e.price(), price);
        assert_eq!(e.volatility(), volatility);
    }
}

mod coordinator {
    use super::*;

    #[test]
    fn adding_instruments_does_not_change_existing_walks() {
        let table = VolatilityTable::default();
        let build = |names: &[(&str, u64)]| {
            let mut c = RoundCoordinator::new();
            for (name, seed) in names {
                c.register(
                    PriceEngine::new(
                        &make_instrument(name, &["Growth"]),
                        &table,
                        PriceRange::default(),
                        StdRng::seed_from_u64(*seed),
                    )
                    .unwrap(),
                )
                .unwrap();
            }
            c
        };
        let mut small = build(&[("A", 1)]);
        let mut large = build(&[("B", 2), ("A", 1), ("C", 3)]);

        let mut s = small.snapshot(0);
        let mut l = large.snapshot(0);
        for _ in 0..50 {
            s = small.advance(&s).snapshot;
            l = large.advance(&l).snapshot;
            assert_eq!(s.price("A"), l.price("A"));
        }
        assert_eq!(l.round(), 50);
    }
}

mod session_runs {
    use super::*;

    fn run(port: &MockDataPort, config: &SimulationConfig) -> SessionResult {
        let universe = port.load_instruments().unwrap();
        let orders = port.load_orders().unwrap();
        Session::new(config, &universe).unwrap().run(&orders).unwrap()
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let port = sample_port()
            .with_order(make_order(1, "Alice", "NVDA", 20))
            .with_order(make_order(2, "Bob", "OXY", -15))
            .with_order(make_order(4, "Alice", "NVDA", -20));
        let a = run(&port, &sample_config(77));
        let b = run(&port, &sample_config(77));
        assert_eq!(a.opening, b.opening);
        assert_eq!(a.rounds, b.rounds);
    }

    #[test]
    fn different_seeds_diverge() {
        let port = sample_port();
        let a = run(&port, &sample_config(1));
        let b = run(&port, &sample_config(2));
        assert_ne!(a.final_snapshot(), b.final_snapshot());
    }

    #[test]
    fn recoverable_rejections_do_not_stop_the_session() {
        let port = sample_port()
            .with_order(make_order(1, "Carol", "NVDA", 1))
            .with_order(make_order(1, "Alice", "AAPL", 1))
            .with_order(make_order(1, "Alice", "NVDA", 0))
            .with_order(make_order(1, "Alice", "NVDA", 10_000_000))
            .with_order(make_order(1, "Alice", "NVDA", 1));
        let result = run(&port, &sample_config(3));

        let first = &result.rounds[0];
        assert_eq!(first.rejections.len(), 4);
        assert_eq!(first.fills.len(), 1);
        assert_eq!(result.rounds.len(), 5);
    }

    #[test]
    fn limit_orders_follow_the_market() {
        let port = sample_port()
            .with_order(limit_order(1, "Alice", "OXY", 5, 1_000_000.0))
            .with_order(limit_order(1, "Bob", "OXY", 5, 0.001));
        let result = run(&port, &sample_config(9));
        let first = &result.rounds[0];
        assert_eq!(first.fills.len(), 1);
        assert_eq!(first.fills[0].holder, "Alice");
        assert!(first.rejections[0].reason.contains("limit not met"));
    }

    #[test]
    fn net_worth_matches_cash_plus_positions() {
        let port = sample_port()
            .with_order(make_order(1, "Alice", "NVDA", 30))
            .with_order(make_order(2, "Alice", "GLD", -40))
            .with_order(make_order(3, "Bob", "FF", 25));
        let result = run(&port, &sample_config(12));
        let snapshot = result.final_snapshot();

        for ledger in &result.ledgers {
            let expected = ledger.cash()
                + ledger
                    .holdings()
                    .map(|(name, pos)| pos.quantity as f64 * snapshot.price(name).unwrap())
                    .sum::<f64>();
            let standing = result
                .standings()
                .into_iter()
                .find(|v| v.holder == ledger.holder())
                .unwrap();
            assert_relative_eq!(standing.net_worth, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn fills_use_the_price_before_settlement() {
        let port = sample_port().with_order(make_order(2, "Bob", "TSM", 3));
        let result = run(&port, &sample_config(21));
        let fill = &result.rounds[1].fills[0];
        assert_eq!(Some(fill.price), result.rounds[0].snapshot.price("TSM"));
    }

    #[test]
    fn active_instruments_draws_a_subset() {
        let config = SimulationConfig {
            active_instruments: Some(3),
            ..sample_config(4)
        };
        let result = run(&sample_port(), &config);
        assert_eq!(result.opening.len(), 3);
        for (name, _) in result.opening.iter() {
            assert!(sample_universe().iter().any(|d| d.name == name));
        }
    }

    #[test]
    fn duplicate_instrument_is_invalid_construction() {
        let port = MockDataPort::new()
            .with_instrument("NVDA", &["Growth"])
            .with_instrument("NVDA", &["Mature"]);
        let universe = port.load_instruments().unwrap();
        assert!(matches!(
            Session::new(&sample_config(1), &universe),
            Err(WavetraderError::InvalidConstruction { .. })
        ));
    }
}
