//! Configuration validation.
//!
//! Validates every simulation key before a session is built. Missing keys
//! fall back to their defaults; present keys must parse and be in range.

use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::category::{Category, VolatilityBand, VolatilityTable};
use crate::domain::error::WavetraderError;
use crate::domain::price_engine::PRICE_FLOOR;
use crate::ports::config_port::ConfigPort;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    validate_seed(config)?;
    validate_rounds(config)?;
    validate_active_instruments(config)?;
    validate_initial_cash(config)?;
    validate_holders(config)?;
    validate_price_range(config)?;
    validate_volatility(config)?;
    Ok(())
}

/// Read and parse an optional key. Blank values count as missing.
pub fn optional_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, WavetraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw.trim()))),
    }
}

/// Split a comma separated list, dropping blank entries.
pub fn parse_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> WavetraderError {
    WavetraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    optional_value::<u64>(config, "simulation", "seed")?;
    Ok(())
}

fn validate_rounds(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    if let Some(rounds) = optional_value::<i64>(config, "simulation", "rounds")? {
        if rounds < 1 || rounds > u32::MAX as i64 {
            return Err(invalid("simulation", "rounds", "rounds must be at least 1"));
        }
    }
    Ok(())
}

fn validate_active_instruments(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    if let Some(count) = optional_value::<i64>(config, "simulation", "active_instruments")? {
        if count < 1 {
            return Err(invalid(
                "simulation",
                "active_instruments",
                "active_instruments must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    if let Some(cash) = optional_value::<f64>(config, "simulation", "initial_cash")? {
        if !cash.is_finite() || cash < 0.0 {
            return Err(invalid(
                "simulation",
                "initial_cash",
                "initial_cash must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_holders(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    let Some(raw) = config.get_string("simulation", "holders") else {
        return Ok(());
    };
    let names = parse_names(&raw);
    if names.is_empty() {
        return Err(invalid("simulation", "holders", "at least one holder is required"));
    }
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(invalid(
                "simulation",
                "holders",
                format!("duplicate holder '{name}'"),
            ));
        }
    }
    Ok(())
}

fn validate_price_range(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    let min = optional_value::<f64>(config, "pricing", "initial_price_min")?.unwrap_or(10.0);
    let max = optional_value::<f64>(config, "pricing", "initial_price_max")?.unwrap_or(200.0);
    if !min.is_finite() || min < PRICE_FLOOR {
        return Err(invalid(
            "pricing",
            "initial_price_min",
            format!("initial_price_min must be at least {PRICE_FLOOR}"),
        ));
    }
    if !max.is_finite() || max < min {
        return Err(invalid(
            "pricing",
            "initial_price_max",
            "initial_price_max must not be below initial_price_min",
        ));
    }
    Ok(())
}

fn validate_volatility(config: &dyn ConfigPort) -> Result<(), WavetraderError> {
    let defaults = VolatilityTable::default();
    for stage in Category::STAGES {
        let prefix = stage.as_str().to_lowercase();
        validate_band(config, &prefix, defaults.band(stage))?;
        let key = format!("{prefix}_modifier");
        if let Some(modifier) = optional_value::<f64>(config, "volatility", &key)? {
            if !modifier.is_finite() || modifier <= 0.0 {
                return Err(invalid("volatility", &key, "modifier must be positive"));
            }
        }
    }
    validate_band(config, "default", defaults.band(Category::Unclassified))
}

/// Keys left out fall back to `fallback`, so a lone override must still fit
/// the other built-in bound.
fn validate_band(
    config: &dyn ConfigPort,
    prefix: &str,
    fallback: VolatilityBand,
) -> Result<(), WavetraderError> {
    let min_key = format!("{prefix}_min");
    let max_key = format!("{prefix}_max");
    let min_value = optional_value::<f64>(config, "volatility", &min_key)?;
    let max_value = optional_value::<f64>(config, "volatility", &max_key)?;
    let min = min_value.unwrap_or(fallback.min());
    let max = max_value.unwrap_or(fallback.max());
    if !min.is_finite() || min <= 0.0 {
        return Err(invalid("volatility", &min_key, "band minimum must be positive"));
    }
    if !max.is_finite() || max < min {
        let key = if max_value.is_some() { &max_key } else { &min_key };
        return Err(invalid(
            "volatility",
            key,
            format!("band [{min}, {max}] is inverted"),
        ));
    }
    Ok(())
}
