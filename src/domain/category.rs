//! Instrument lifecycle categories and their volatility bands.
//!
//! An instrument's category is resolved once from its tag list: the first tag
//! naming a stage wins. Volatility modifiers are resolved separately, as the
//! product over every stage tag present, so an instrument tagged with two
//! stages is bounded by the first but adjusted by both.

use rand::Rng;
use std::fmt;

use super::error::WavetraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Startup,
    Growth,
    Mature,
    Decline,
    /// No stage tag present.
    Unclassified,
}

impl Category {
    /// The four lifecycle stages, in modifier application order.
    pub const STAGES: [Category; 4] = [
        Category::Growth,
        Category::Decline,
        Category::Startup,
        Category::Mature,
    ];

    /// Match a single tag against the stage tokens.
    ///
    /// English names match case-insensitively; the stage tokens used by the
    /// bundled Chinese data set are accepted as aliases.
    pub fn from_tag(tag: &str) -> Option<Category> {
        match tag.trim().to_lowercase().as_str() {
            "startup" | "初创" => Some(Category::Startup),
            "growth" | "成长" => Some(Category::Growth),
            "mature" | "成熟" => Some(Category::Mature),
            "decline" | "衰退" => Some(Category::Decline),
            _ => None,
        }
    }

    /// First matching stage tag, or `Unclassified`.
    pub fn classify<S: AsRef<str>>(tags: &[S]) -> Category {
        tags.iter()
            .find_map(|t| Category::from_tag(t.as_ref()))
            .unwrap_or(Category::Unclassified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Startup => "Startup",
            Category::Growth => "Growth",
            Category::Mature => "Mature",
            Category::Decline => "Decline",
            Category::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[min, max]` range volatility is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityBand {
    min: f64,
    max: f64,
}

impl VolatilityBand {
    pub fn new(min: f64, max: f64) -> Result<Self, WavetraderError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(WavetraderError::construction(
                "volatility band bounds must be finite",
            ));
        }
        if min <= 0.0 {
            return Err(WavetraderError::construction(format!(
                "volatility band min must be positive, got {min}"
            )));
        }
        if min > max {
            return Err(WavetraderError::construction(format!(
                "volatility band min {min} exceeds max {max}"
            )));
        }
        Ok(VolatilityBand { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn clamp(&self, volatility: f64) -> f64 {
        volatility.clamp(self.min, self.max)
    }

    pub fn contains(&self, volatility: f64) -> bool {
        (self.min..=self.max).contains(&volatility)
    }

    /// Uniform draw from the band.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let unit: f64 = rng.r#gen();
        self.clamp(self.min + unit * (self.max - self.min))
    }
}

/// Band and per-round multiplier for one lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageProfile {
    pub band: VolatilityBand,
    pub modifier: f64,
}

impl StageProfile {
    pub fn new(band: VolatilityBand, modifier: f64) -> Result<Self, WavetraderError> {
        if !modifier.is_finite() || modifier <= 0.0 {
            return Err(WavetraderError::construction(format!(
                "volatility modifier must be positive, got {modifier}"
            )));
        }
        Ok(StageProfile { band, modifier })
    }
}

/// Lookup table from category to band and modifier.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityTable {
    startup: StageProfile,
    growth: StageProfile,
    mature: StageProfile,
    decline: StageProfile,
    unclassified: VolatilityBand,
}

impl Default for VolatilityTable {
    fn default() -> Self {
        let profile = |min: f64, max: f64, modifier: f64| StageProfile {
            band: VolatilityBand { min, max },
            modifier,
        };
        VolatilityTable {
            startup: profile(0.30, 0.40, 1.3),
            growth: profile(0.10, 0.30, 1.2),
            mature: profile(0.01, 0.10, 0.8),
            decline: profile(0.05, 0.20, 0.9),
            unclassified: VolatilityBand {
                min: 0.20,
                max: 0.40,
            },
        }
    }
}

impl VolatilityTable {
    /// Profile of a lifecycle stage; `None` for `Unclassified`.
    pub fn stage(&self, category: Category) -> Option<&StageProfile> {
        match category {
            Category::Startup => Some(&self.startup),
            Category::Growth => Some(&self.growth),
            Category::Mature => Some(&self.mature),
            Category::Decline => Some(&self.decline),
            Category::Unclassified => None,
        }
    }

    /// Replace a stage's profile. Setting `Unclassified` is an error; use
    /// [`VolatilityTable::set_unclassified_band`].
    pub fn set_stage(
        &mut self,
        category: Category,
        profile: StageProfile,
    ) -> Result<(), WavetraderError> {
        let slot = match category {
            Category::Startup => &mut self.startup,
            Category::Growth => &mut self.growth,
            Category::Mature => &mut self.mature,
            Category::Decline => &mut self.decline,
            Category::Unclassified => {
                return Err(WavetraderError::construction(
                    "unclassified instruments have no volatility modifier",
                ));
            }
        };
        *slot = profile;
        Ok(())
    }

    pub fn set_unclassified_band(&mut self, band: VolatilityBand) {
        self.unclassified = band;
    }

    pub fn band(&self, category: Category) -> VolatilityBand {
        self.stage(category)
            .map(|p| p.band)
            .unwrap_or(self.unclassified)
    }

    /// Product of the modifiers of every stage tag present, each stage
    /// counted once. `1.0` when no stage tag is present.
    pub fn modifier_for<S: AsRef<str>>(&self, tags: &[S]) -> f64 {
        Category::STAGES
            .iter()
            .filter(|stage| {
                tags.iter()
                    .any(|t| Category::from_tag(t.as_ref()) == Some(**stage))
            })
            .filter_map(|stage| self.stage(*stage))
            .map(|p| p.modifier)
            .product()
    }
}
