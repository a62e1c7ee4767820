//! CSV file data adapter.
//!
//! Instruments file: a `name` column plus any number of tag columns; every
//! non-empty tag cell is kept in column order. Orders file:
//! `round,holder,instrument,quantity[,limit]`.

use crate::domain::error::WavetraderError;
use crate::domain::instrument::InstrumentDef;
use crate::domain::trade::Order;
use crate::ports::data_port::DataPort;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const BOM: char = '\u{feff}';

pub struct CsvAdapter {
    instruments_path: PathBuf,
    orders_path: Option<PathBuf>,
}

impl CsvAdapter {
    pub fn new(instruments_path: PathBuf) -> Self {
        Self {
            instruments_path,
            orders_path: None,
        }
    }

    pub fn with_orders(mut self, orders_path: PathBuf) -> Self {
        self.orders_path = Some(orders_path);
        self
    }
}

impl DataPort for CsvAdapter {
    fn load_instruments(&self) -> Result<Vec<InstrumentDef>, WavetraderError> {
        let file = open(&self.instruments_path)?;
        let instruments =
            parse_instruments(file).map_err(|e| in_file(e, &self.instruments_path))?;
        debug!(
            path = %self.instruments_path.display(),
            count = instruments.len(),
            "instruments loaded"
        );
        Ok(instruments)
    }

    fn load_orders(&self) -> Result<Vec<Order>, WavetraderError> {
        let Some(path) = &self.orders_path else {
            return Ok(Vec::new());
        };
        let orders = parse_orders(open(path)?).map_err(|e| in_file(e, path))?;
        debug!(path = %path.display(), count = orders.len(), "orders loaded");
        Ok(orders)
    }
}

pub fn parse_instruments<R: Read>(reader: R) -> Result<Vec<InstrumentDef>, WavetraderError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = clean_headers(rdr.headers().map_err(data_error)?);
    let name_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("name"))
        .ok_or_else(|| WavetraderError::Data {
            reason: "missing name column".into(),
        })?;

    let mut instruments = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(data_error)?;
        let name = record.get(name_col).unwrap_or_default();
        if name.is_empty() {
            if record.iter().all(str::is_empty) {
                continue;
            }
            return Err(WavetraderError::Data {
                reason: format!("empty instrument name on line {}", line_of(&record)),
            });
        }
        let tags = record
            .iter()
            .enumerate()
            .filter(|(i, cell)| *i != name_col && !cell.is_empty())
            .map(|(_, cell)| cell.to_string())
            .collect();
        instruments.push(InstrumentDef::new(name, tags));
    }
    Ok(instruments)
}

pub fn parse_orders<R: Read>(reader: R) -> Result<Vec<Order>, WavetraderError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = clean_headers(rdr.headers().map_err(data_error)?);
    rdr.set_headers(headers);
    rdr.deserialize()
        .collect::<Result<Vec<Order>, _>>()
        .map_err(data_error)
}

fn clean_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| h.trim_start_matches(BOM).trim().to_lowercase())
        .collect()
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

fn open(path: &Path) -> Result<File, WavetraderError> {
    File::open(path).map_err(|e| WavetraderError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

fn data_error(e: csv::Error) -> WavetraderError {
    WavetraderError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

fn in_file(e: WavetraderError, path: &Path) -> WavetraderError {
    match e {
        WavetraderError::Data { reason } => WavetraderError::Data {
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    }
}
