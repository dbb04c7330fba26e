//! Buses, loads and carriers
use crate::id::{BusID, CarrierID, CountryID, LoadID, define_id_getter};
use crate::series::TimeSeries;

/// A node of the network at which energy is balanced
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// Unique identifier
    pub id: BusID,
    /// The carrier balanced at the bus
    pub carrier: CarrierID,
    /// The country the bus lies in
    pub country: Option<CountryID>,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
    /// Dual price of the energy balance (marginal price) from the most recent solve
    pub marginal_price: Option<TimeSeries>,
}
define_id_getter! {Bus, BusID}

/// An inflexible demand at a bus
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    /// Unique identifier
    pub id: LoadID,
    /// The bus the demand is drawn from
    pub bus: BusID,
    /// Demand (MW) at every snapshot
    pub p_set: TimeSeries,
}
define_id_getter! {Load, LoadID}

/// An energy carrier
#[derive(Debug, Clone, PartialEq)]
pub struct Carrier {
    /// Unique identifier
    pub id: CarrierID,
    /// Emissions (t CO2 per MWh of primary energy)
    pub co2_emissions: f64,
}
define_id_getter! {Carrier, CarrierID}
