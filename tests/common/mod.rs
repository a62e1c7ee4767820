#![allow(dead_code)]

use wavetrader::domain::error::WavetraderError;
use wavetrader::domain::instrument::InstrumentDef;
use wavetrader::domain::session::SimulationConfig;
use wavetrader::domain::trade::Order;
use wavetrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub instruments: Vec<InstrumentDef>,
    pub orders: Vec<Order>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            orders: Vec::new(),
            error: None,
        }
    }

    pub fn with_instrument(mut self, name: &str, tags: &[&str]) -> Self {
        self.instruments.push(make_instrument(name, tags));
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_instruments(&self) -> Result<Vec<InstrumentDef>, WavetraderError> {
        if let Some(reason) = &self.error {
            return Err(WavetraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.instruments.clone())
    }

    fn load_orders(&self) -> Result<Vec<Order>, WavetraderError> {
        Ok(self.orders.clone())
    }
}

pub fn make_instrument(name: &str, tags: &[&str]) -> InstrumentDef {
    InstrumentDef::new(name, tags.iter().map(|t| t.to_string()).collect())
}

pub fn make_order(round: u32, holder: &str, instrument: &str, quantity: i64) -> Order {
    Order {
        round,
        holder: holder.to_string(),
        instrument: instrument.to_string(),
        quantity,
        limit: None,
    }
}

pub fn limit_order(
    round: u32,
    holder: &str,
    instrument: &str,
    quantity: i64,
    limit: f64,
) -> Order {
    Order {
        limit: Some(limit),
        ..make_order(round, holder, instrument, quantity)
    }
}

/// Six instruments covering every category.
pub fn sample_universe() -> Vec<InstrumentDef> {
    vec![
        make_instrument("NVDA", &["Semiconductors", "Growth", "North America"]),
        make_instrument("TSM", &["Semiconductors", "Mature", "Asia"]),
        make_instrument("OXY", &["Oil", "Mature"]),
        make_instrument("FF", &["Autos", "Startup"]),
        make_instrument("VNK", &["Real Estate", "Decline"]),
        make_instrument("GLD", &["Commodities"]),
    ]
}

pub fn sample_port() -> MockDataPort {
    let mut port = MockDataPort::new();
    port.instruments = sample_universe();
    port
}

pub fn sample_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        seed: Some(seed),
        rounds: 5,
        holders: vec!["Alice".to_string(), "Bob".to_string()],
        ..SimulationConfig::default()
    }
}
