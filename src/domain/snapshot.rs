//! Immutable per-round price snapshots.

use std::collections::HashMap;

/// Prices of every registered instrument at the end of a round, in
/// registration order. Round 0 is the opening snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSnapshot {
    round: u32,
    order: Vec<String>,
    prices: HashMap<String, f64>,
}

impl PriceSnapshot {
    /// Build a snapshot; later duplicates of a name overwrite earlier prices
    /// but keep the first position.
    pub fn new<I, S>(round: u32, prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut snapshot = PriceSnapshot {
            round,
            order: Vec::new(),
            prices: HashMap::new(),
        };
        for (name, price) in prices {
            let name = name.into();
            if snapshot.prices.insert(name.clone(), price).is_none() {
                snapshot.order.push(name);
            }
        }
        snapshot
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn price(&self, instrument: &str) -> Option<f64> {
        self.prices.get(instrument).copied()
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.prices.contains_key(instrument)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(instrument, price)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.prices[name]))
    }
}
