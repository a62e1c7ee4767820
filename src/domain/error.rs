//! Domain error types.

/// Top-level error type for wavetrader.
#[derive(Debug, thiserror::Error)]
pub enum WavetraderError {
    #[error("invalid construction: {reason}")]
    InvalidConstruction { reason: String },

    #[error("insufficient funds for {holder}: buying {instrument} costs {cost:.2}, cash is {cash:.2}")]
    InsufficientFunds {
        holder: String,
        instrument: String,
        cost: f64,
        cash: f64,
    },

    #[error("unknown instrument: {name}")]
    UnknownInstrument { name: String },

    #[error("unknown holder: {name}")]
    UnknownHolder { name: String },

    #[error("price snapshot has no price for held instrument {instrument}")]
    MissingPriceInSnapshot { instrument: String },

    #[error("invalid trade: {reason}")]
    InvalidTrade { reason: String },

    #[error("limit not met for {instrument}: price {price:.2}, limit {limit:.2}")]
    LimitNotMet {
        instrument: String,
        price: f64,
        limit: f64,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WavetraderError {
    pub(crate) fn construction(reason: impl Into<String>) -> Self {
        WavetraderError::InvalidConstruction {
            reason: reason.into(),
        }
    }

    /// Errors that reject a single trade request and leave all state as it was.
    pub fn is_trade_rejection(&self) -> bool {
        matches!(
            self,
            WavetraderError::InsufficientFunds { .. }
                | WavetraderError::UnknownInstrument { .. }
                | WavetraderError::UnknownHolder { .. }
                | WavetraderError::InvalidTrade { .. }
                | WavetraderError::LimitNotMet { .. }
        )
    }
}

impl From<&WavetraderError> for std::process::ExitCode {
    fn from(err: &WavetraderError) -> Self {
        let code: u8 = match err {
            WavetraderError::Io(_) => 1,
            WavetraderError::ConfigParse { .. }
            | WavetraderError::ConfigMissing { .. }
            | WavetraderError::ConfigInvalid { .. } => 2,
            WavetraderError::Data { .. } => 3,
            WavetraderError::InvalidConstruction { .. } => 4,
            WavetraderError::InsufficientFunds { .. }
            | WavetraderError::UnknownInstrument { .. }
            | WavetraderError::UnknownHolder { .. }
            | WavetraderError::MissingPriceInSnapshot { .. }
            | WavetraderError::InvalidTrade { .. }
            | WavetraderError::LimitNotMet { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
