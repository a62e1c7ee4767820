//! Instrument definitions as supplied by the data layer.

use super::category::Category;
use super::error::WavetraderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDef {
    pub name: String,
    pub tags: Vec<String>,
}

impl InstrumentDef {
    pub fn new(name: impl Into<String>, tags: Vec<String>) -> Self {
        InstrumentDef {
            name: name.into(),
            tags,
        }
    }

    pub fn category(&self) -> Category {
        Category::classify(&self.tags)
    }

    pub fn validate(&self) -> Result<(), WavetraderError> {
        if self.name.trim().is_empty() {
            return Err(WavetraderError::construction(
                "instrument name must not be empty",
            ));
        }
        Ok(())
    }
}

/// Check a universe for empty and duplicate names.
pub fn validate_universe(universe: &[InstrumentDef]) -> Result<(), WavetraderError> {
    let mut seen = std::collections::HashSet::new();
    for def in universe {
        def.validate()?;
        if !seen.insert(def.name.as_str()) {
            return Err(WavetraderError::construction(format!(
                "duplicate instrument: {}",
                def.name
            )));
        }
    }
    Ok(())
}
