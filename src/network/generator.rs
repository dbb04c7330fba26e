//! Generators
use super::{CapacityLimits, define_capacity_getter};
use crate::id::{BusID, CarrierID, GeneratorID, define_id_getter};
use crate::series::TimeSeries;
use crate::technology::Technology;
use crate::units::{MoneyPerCapacity, MoneyPerEnergy};

/// A generator attached to a single bus
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    /// Unique identifier
    pub id: GeneratorID,
    /// The bus the generator feeds into
    pub bus: BusID,
    /// The generator's carrier
    pub carrier: CarrierID,
    /// Technology tag, resolved when the network is loaded
    pub technology: Technology,
    /// Installed power capacity (MW)
    pub capacity: CapacityLimits,
    /// Minimum output per unit of capacity
    pub p_min_pu: f64,
    /// Static availability per unit of capacity
    pub p_max_pu: f64,
    /// Time-varying availability per unit of capacity, overriding [`Generator::p_max_pu`]
    pub p_max_pu_t: Option<TimeSeries>,
    /// Cost per MWh of output
    pub marginal_cost: MoneyPerEnergy,
    /// Annualised cost per MW of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Conversion efficiency from primary energy
    pub efficiency: f64,
    /// Dispatch (MW) from the most recent solve
    pub dispatch: Option<TimeSeries>,
}
define_id_getter! {Generator, GeneratorID}
define_capacity_getter! {Generator}

impl Generator {
    /// The availability per unit of capacity at the given snapshot
    pub fn availability(&self, snapshot: usize) -> f64 {
        self.p_max_pu_t
            .as_ref()
            .map_or(self.p_max_pu, |series| series[snapshot])
    }
}
