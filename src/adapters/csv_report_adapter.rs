//! CSV history report adapter.

use crate::domain::error::WavetraderError;
use crate::domain::session::{SessionResult, Valuation};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct PriceRow<'a> {
    round: u32,
    instrument: &'a str,
    price: f64,
    change_pct: f64,
    /// Empty for the opening round.
    volatility: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NetWorthRow<'a> {
    round: u32,
    holder: &'a str,
    cash: f64,
    net_worth: f64,
}

impl<'a> NetWorthRow<'a> {
    fn new(round: u32, valuation: &'a Valuation) -> Self {
        NetWorthRow {
            round,
            holder: &valuation.holder,
            cash: valuation.cash,
            net_worth: valuation.net_worth,
        }
    }
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_prices(&self, result: &SessionResult, path: &Path) -> Result<(), WavetraderError> {
        let opening = result.opening.iter().map(|(instrument, price)| PriceRow {
            round: 0,
            instrument,
            price,
            change_pct: 0.0,
            volatility: None,
        });
        let settled = result.rounds.iter().flat_map(|record| {
            record.moves.iter().map(move |mv| PriceRow {
                round: record.round,
                instrument: &mv.instrument,
                price: mv.price,
                change_pct: mv.change_pct(),
                volatility: Some(mv.volatility),
            })
        });
        let rows = write_rows(path, opening.chain(settled))?;
        info!(path = %path.display(), rows, "price history written");
        Ok(())
    }

    fn write_net_worth(
        &self,
        result: &SessionResult,
        path: &Path,
    ) -> Result<(), WavetraderError> {
        let opening = result
            .opening_valuations
            .iter()
            .map(|v| NetWorthRow::new(0, v));
        let settled = result.rounds.iter().flat_map(|record| {
            record
                .valuations
                .iter()
                .map(move |v| NetWorthRow::new(record.round, v))
        });
        let rows = write_rows(path, opening.chain(settled))?;
        info!(path = %path.display(), rows, "net worth history written");
        Ok(())
    }
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<usize, WavetraderError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row).map_err(|e| report_error(path, e))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

fn report_error(path: &Path, e: csv::Error) -> WavetraderError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => WavetraderError::Io(io),
        other => WavetraderError::Data {
            reason: format!("failed to write {}: {:?}", path.display(), other),
        },
    }
}
