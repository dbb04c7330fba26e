//! Lines and links connecting pairs of buses
use super::{CapacityLimits, define_capacity_getter};
use crate::id::{BusID, CarrierID, LineID, LinkID, define_id_getter};
use crate::series::TimeSeries;
use crate::technology::Technology;
use crate::units::{MoneyPerCapacity, MoneyPerEnergy};

/// A transmission line, modelled as a transport link with symmetric capacity
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Unique identifier
    pub id: LineID,
    /// The bus at the start of the line
    pub bus0: BusID,
    /// The bus at the end of the line
    pub bus1: BusID,
    /// The line's carrier
    pub carrier: CarrierID,
    /// Technology tag, resolved when the network is loaded
    pub technology: Technology,
    /// Thermal capacity (MVA)
    pub capacity: CapacityLimits,
    /// Usable fraction of the thermal capacity
    pub s_max_pu: f64,
    /// Length (km)
    pub length: f64,
    /// Annualised cost per MVA of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Flow from `bus0` to `bus1` (MW) from the most recent solve
    pub flow: Option<TimeSeries>,
}
define_id_getter! {Line, LineID}
define_capacity_getter! {Line}

/// A controllable link between two buses (e.g. an HVDC interconnector)
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Unique identifier
    pub id: LinkID,
    /// The bus power is withdrawn from
    pub bus0: BusID,
    /// The bus power is delivered to
    pub bus1: BusID,
    /// The link's carrier
    pub carrier: CarrierID,
    /// Technology tag, resolved when the network is loaded
    pub technology: Technology,
    /// Power capacity (MW)
    pub capacity: CapacityLimits,
    /// Minimum flow per unit of capacity (negative for bidirectional links)
    pub p_min_pu: f64,
    /// Maximum flow per unit of capacity
    pub p_max_pu: f64,
    /// Fraction of the withdrawn power arriving at `bus1`
    pub efficiency: f64,
    /// Length (km)
    pub length: f64,
    /// Cost per MWh transferred
    pub marginal_cost: MoneyPerEnergy,
    /// Annualised cost per MW of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Power withdrawn from `bus0` (MW) from the most recent solve
    pub flow: Option<TimeSeries>,
}
define_id_getter! {Link, LinkID}
define_capacity_getter! {Link}
