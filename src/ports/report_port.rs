//! Report generation port trait.

use crate::domain::error::WavetraderError;
use crate::domain::session::SessionResult;
use std::path::Path;

/// Port for writing session results.
pub trait ReportPort {
    /// Price history: the opening snapshot followed by every settled round.
    fn write_prices(&self, result: &SessionResult, path: &Path) -> Result<(), WavetraderError>;

    /// Cash and net worth of every holder per round.
    fn write_net_worth(&self, result: &SessionResult, path: &Path)
    -> Result<(), WavetraderError>;
}
