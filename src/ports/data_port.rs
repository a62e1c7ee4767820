//! Data access port trait.

use crate::domain::error::WavetraderError;
use crate::domain::instrument::InstrumentDef;
use crate::domain::trade::Order;

pub trait DataPort {
    /// The instrument universe in source order.
    fn load_instruments(&self) -> Result<Vec<InstrumentDef>, WavetraderError>;

    /// Scheduled orders in source order. Sources without orders return an
    /// empty list.
    fn load_orders(&self) -> Result<Vec<Order>, WavetraderError>;
}
