//! Bounded stochastic price walk for a single instrument.
//!
//! Each round the price moves by a normally distributed fraction scaled by the
//! instrument's volatility, truncated to +/-100%, floored at one cent and
//! rounded to cents. Volatility is then multiplied by the instrument's stage
//! modifiers and clamped back into its category band.

use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::PI;
use tracing::debug;

use super::category::{Category, VolatilityBand, VolatilityTable};
use super::error::WavetraderError;
use super::instrument::InstrumentDef;

pub const PRICE_FLOOR: f64 = 0.01;

/// Largest fractional move allowed in one round.
pub const MAX_ROUND_MOVE: f64 = 1.0;

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Uniform draw in the open interval (0, 1).
fn open_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.r#gen();
        if u != 0.0 {
            return u;
        }
    }
}

/// One standard normal sample via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u = open_unit(rng);
    let v = open_unit(rng);
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Scale a standard normal sample by volatility and truncate to one full move.
pub fn truncated_change(sample: f64, volatility: f64) -> f64 {
    (sample * volatility).clamp(-MAX_ROUND_MOVE, MAX_ROUND_MOVE)
}

/// Range an instrument's opening price is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        PriceRange {
            min: 10.0,
            max: 200.0,
        }
    }
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self, WavetraderError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(WavetraderError::construction(
                "initial price range must be finite",
            ));
        }
        if min < PRICE_FLOOR {
            return Err(WavetraderError::construction(format!(
                "initial price min must be at least {PRICE_FLOOR}, got {min}"
            )));
        }
        if min > max {
            return Err(WavetraderError::construction(format!(
                "initial price min {min} exceeds max {max}"
            )));
        }
        Ok(PriceRange { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Uniform draw rounded to cents.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let unit: f64 = rng.r#gen();
        round_to_cents(self.min + unit * (self.max - self.min)).max(PRICE_FLOOR)
    }
}

/// One step of a what-if projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewStep {
    pub round: usize,
    pub price: f64,
    pub change: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone)]
pub struct PriceEngine<R = StdRng> {
    name: String,
    tags: Vec<String>,
    category: Category,
    band: VolatilityBand,
    modifier: f64,
    price: f64,
    volatility: f64,
    rng: R,
}

impl<R: Rng> PriceEngine<R> {
    /// Build an engine with a random opening price and volatility.
    pub fn new(
        def: &InstrumentDef,
        table: &VolatilityTable,
        price_range: PriceRange,
        mut rng: R,
    ) -> Result<Self, WavetraderError> {
        def.validate()?;
        let category = def.category();
        let band = table.band(category);
        let price = price_range.sample(&mut rng);
        let volatility = band.sample(&mut rng);
        Ok(PriceEngine {
            name: def.name.clone(),
            tags: def.tags.clone(),
            category,
            band,
            modifier: table.modifier_for(&def.tags),
            price,
            volatility,
            rng,
        })
    }

    /// Build an engine from an explicit price and volatility.
    pub fn with_state(
        def: &InstrumentDef,
        table: &VolatilityTable,
        price: f64,
        volatility: f64,
        rng: R,
    ) -> Result<Self, WavetraderError> {
        def.validate()?;
        if !price.is_finite() || price < PRICE_FLOOR {
            return Err(WavetraderError::construction(format!(
                "price for {} must be at least {PRICE_FLOOR}, got {price}",
                def.name
            )));
        }
        let category = def.category();
        let band = table.band(category);
        if !band.contains(volatility) {
            return Err(WavetraderError::construction(format!(
                "volatility {volatility} for {} outside {category} band [{}, {}]",
                def.name,
                band.min(),
                band.max()
            )));
        }
        Ok(PriceEngine {
            name: def.name.clone(),
            tags: def.tags.clone(),
            category,
            band,
            modifier: table.modifier_for(&def.tags),
            price: round_to_cents(price),
            volatility,
            rng,
        })
    }

    /// Advance one round and return the fractional price change.
    pub fn advance_round(&mut self) -> f64 {
        let change = truncated_change(standard_normal(&mut self.rng), self.volatility);
        let previous = self.price;
        self.price = round_to_cents((self.price * (1.0 + change)).max(PRICE_FLOOR));
        self.volatility = self.band.clamp(self.volatility * self.modifier);
        debug!(
            instrument = %self.name,
            previous,
            price = self.price,
            change,
            volatility = self.volatility,
            "price advanced"
        );
        change
    }

    /// Project `rounds` future steps on a copy of this engine driven by `rng`.
    /// The engine itself is not touched.
    pub fn preview<Q: Rng>(&self, rounds: usize, rng: Q) -> Vec<PreviewStep> {
        let mut shadow = PriceEngine {
            name: self.name.clone(),
            tags: self.tags.clone(),
            category: self.category,
            band: self.band,
            modifier: self.modifier,
            price: self.price,
            volatility: self.volatility,
            rng,
        };
        (1..=rounds)
            .map(|round| {
                let change = shadow.advance_round();
                PreviewStep {
                    round,
                    price: shadow.price,
                    change,
                    volatility: shadow.volatility,
                }
            })
            .collect()
    }
}

impl<R> PriceEngine<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn band(&self) -> VolatilityBand {
        self.band
    }

    pub fn modifier(&self) -> f64 {
        self.modifier
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }
}
