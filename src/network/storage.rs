//! Storage units and stores
use super::{CapacityLimits, define_capacity_getter};
use crate::id::{BusID, CarrierID, StorageUnitID, StoreID, define_id_getter};
use crate::series::TimeSeries;
use crate::technology::Technology;
use crate::units::{MoneyPerCapacity, MoneyPerEnergy};

/// A storage unit whose energy capacity is a fixed multiple of its power capacity
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUnit {
    /// Unique identifier
    pub id: StorageUnitID,
    /// The bus the unit is connected to
    pub bus: BusID,
    /// The unit's carrier
    pub carrier: CarrierID,
    /// Technology tag, resolved when the network is loaded
    pub technology: Technology,
    /// Power capacity (MW)
    pub capacity: CapacityLimits,
    /// Hours of storage at full power
    pub max_hours: f64,
    /// Efficiency of charging
    pub efficiency_store: f64,
    /// Efficiency of discharging
    pub efficiency_dispatch: f64,
    /// Fraction of the state of charge lost per hour
    pub standing_loss: f64,
    /// Maximum charging power per unit of capacity (negative)
    pub p_min_pu: f64,
    /// Maximum discharging power per unit of capacity
    pub p_max_pu: f64,
    /// State of charge (MWh) before the first snapshot
    pub state_of_charge_initial: f64,
    /// Whether the final state of charge must equal the initial one
    pub cyclic_state_of_charge: bool,
    /// Whether the cyclic condition applies per investment period
    pub cyclic_state_of_charge_per_period: bool,
    /// Cost per MWh discharged
    pub marginal_cost: MoneyPerEnergy,
    /// Annualised cost per MW of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Natural inflow (MW)
    pub inflow: Option<TimeSeries>,
    /// Discharging power (MW) from the most recent solve
    pub p_dispatch: Option<TimeSeries>,
    /// Charging power (MW) from the most recent solve
    pub p_store: Option<TimeSeries>,
    /// State of charge (MWh) from the most recent solve
    pub state_of_charge: Option<TimeSeries>,
    /// Spilled inflow (MW) from the most recent solve
    pub spill: Option<TimeSeries>,
    /// Dual price of the energy balance constraint from the most recent solve
    pub mu_energy_balance: Option<TimeSeries>,
}
define_id_getter! {StorageUnit, StorageUnitID}
define_capacity_getter! {StorageUnit}

impl StorageUnit {
    /// Net power output (dispatch minus charging) at every snapshot, if the unit has been solved
    pub fn net_dispatch(&self) -> Option<TimeSeries> {
        let dispatch = self.p_dispatch.as_ref()?;
        let store = self.p_store.as_ref()?;
        Some(dispatch.iter().zip(store.iter()).map(|(d, s)| d - s).collect())
    }
}

/// A store of energy with an independently sized energy capacity
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    /// Unique identifier
    pub id: StoreID,
    /// The bus the store is connected to
    pub bus: BusID,
    /// The store's carrier
    pub carrier: CarrierID,
    /// Technology tag, resolved when the network is loaded
    pub technology: Technology,
    /// Energy capacity (MWh)
    pub capacity: CapacityLimits,
    /// Energy (MWh) before the first snapshot
    pub e_initial: f64,
    /// Whether the final energy level must equal the initial one
    pub e_cyclic: bool,
    /// Fraction of the energy level lost per hour
    pub standing_loss: f64,
    /// Cost per MWh withdrawn
    pub marginal_cost: MoneyPerEnergy,
    /// Annualised cost per MWh of capacity
    pub capital_cost: MoneyPerCapacity,
    /// Energy level (MWh) from the most recent solve
    pub energy: Option<TimeSeries>,
    /// Power withdrawn (MW, positive into the bus) from the most recent solve
    pub power: Option<TimeSeries>,
}
define_id_getter! {Store, StoreID}
define_capacity_getter! {Store}
