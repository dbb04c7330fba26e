//! The network model: buses, assets connected to them and their time-varying data.
//!
//! A [`Network`] owns all of its data. Cloning a network produces an independent deep copy, which
//! is how derivative scenarios are created from a solved parent.
use crate::id::{
    BusID, CarrierID, CountryID, GeneratorID, HasID, IDLike, LineID, LinkID, LoadID,
    StorageUnitID, StoreID,
};
use crate::snapshot::Snapshots;
use crate::units::{Capacity, Money};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

mod branch;
pub use branch::{Line, Link};
mod bus;
pub use bus::{Bus, Carrier, Load};
mod generator;
pub use generator::Generator;
mod global;
pub use global::{ConstraintSense, GlobalConstraint, GlobalConstraintType, LV_LIMIT};
mod storage;
pub use storage::{StorageUnit, Store};
pub mod topology;

/// Buses, indexed by ID
pub type BusMap = IndexMap<BusID, Bus>;
/// Generators, indexed by ID
pub type GeneratorMap = IndexMap<GeneratorID, Generator>;
/// Storage units, indexed by ID
pub type StorageUnitMap = IndexMap<StorageUnitID, StorageUnit>;
/// Stores, indexed by ID
pub type StoreMap = IndexMap<StoreID, Store>;
/// Lines, indexed by ID
pub type LineMap = IndexMap<LineID, Line>;
/// Links, indexed by ID
pub type LinkMap = IndexMap<LinkID, Link>;
/// Loads, indexed by ID
pub type LoadMap = IndexMap<LoadID, Load>;

/// Capacity of an asset which may be sized by the optimisation
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityLimits {
    /// The installed capacity, used when the asset is not extendable
    pub nominal: Capacity,
    /// Whether the optimisation may choose the capacity
    pub extendable: bool,
    /// Lower bound on the capacity when extendable
    pub min: Capacity,
    /// Upper bound on the capacity when extendable (may be infinite)
    pub max: Capacity,
    /// The capacity chosen by the most recent solve
    pub optimal: Option<Capacity>,
}

impl CapacityLimits {
    /// A fixed capacity which the optimisation cannot change
    pub fn fixed(nominal: Capacity) -> Self {
        Self {
            nominal,
            extendable: false,
            min: Capacity(0.0),
            max: Capacity(f64::INFINITY),
            optimal: None,
        }
    }

    /// An extendable capacity with the given bounds
    pub fn extendable(min: Capacity, max: Capacity) -> Self {
        Self {
            nominal: min,
            extendable: true,
            min,
            max,
            optimal: None,
        }
    }

    /// The bounds on the capacity in the optimisation
    pub fn bounds(&self) -> (Capacity, Capacity) {
        if self.extendable {
            (self.min, self.max)
        } else {
            (self.nominal, self.nominal)
        }
    }

    /// Fix the capacity at the given value
    pub fn freeze_at(&mut self, capacity: Capacity) {
        self.nominal = capacity;
        self.extendable = false;
    }
}

/// A component whose capacity may be optimised
pub trait HasCapacity {
    /// The capacity limits of the component
    fn capacity(&self) -> &CapacityLimits;

    /// Mutable access to the capacity limits of the component
    fn capacity_mut(&mut self) -> &mut CapacityLimits;
}

/// Implement [`HasCapacity`] for a type with a field called `capacity`
macro_rules! define_capacity_getter {
    ($t:ty) => {
        impl crate::network::HasCapacity for $t {
            fn capacity(&self) -> &crate::network::CapacityLimits {
                &self.capacity
            }

            fn capacity_mut(&mut self) -> &mut crate::network::CapacityLimits {
                &mut self.capacity
            }
        }
    };
}
pub(crate) use define_capacity_getter;

/// Get the optimal capacity of the component in `reference` with the given ID
pub fn reference_optimum<ID, T>(reference: &IndexMap<ID, T>, id: &ID) -> Result<Capacity>
where
    ID: IDLike,
    T: HasCapacity,
{
    let asset = reference
        .get(id)
        .with_context(|| format!("Asset {id} not found in reference network"))?;
    asset
        .capacity()
        .optimal
        .with_context(|| format!("Reference network has no optimal capacity for {id}"))
}

/// A power system network model
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Name of the network, used to label exported results
    pub name: String,
    /// The snapshots over which the network is modelled
    pub snapshots: Snapshots,
    /// Energy carriers
    pub carriers: IndexMap<CarrierID, Carrier>,
    /// Buses
    pub buses: BusMap,
    /// Generators
    pub generators: GeneratorMap,
    /// Storage units (fixed energy-to-power ratio)
    pub storage_units: StorageUnitMap,
    /// Stores (independently sized energy capacity)
    pub stores: StoreMap,
    /// AC lines
    pub lines: LineMap,
    /// Controllable links
    pub links: LinkMap,
    /// Loads
    pub loads: LoadMap,
    /// Network-wide constraints, indexed by name
    pub global_constraints: IndexMap<String, GlobalConstraint>,
    /// Objective value of the most recent solve
    pub objective: Option<Money>,
}

impl Network {
    /// Create an empty network over the given snapshots
    pub fn new(name: &str, snapshots: Snapshots) -> Self {
        Self {
            name: name.to_string(),
            snapshots,
            carriers: IndexMap::new(),
            buses: IndexMap::new(),
            generators: IndexMap::new(),
            storage_units: IndexMap::new(),
            stores: IndexMap::new(),
            lines: IndexMap::new(),
            links: IndexMap::new(),
            loads: IndexMap::new(),
            global_constraints: IndexMap::new(),
            objective: None,
        }
    }

    /// Get the country of a bus
    pub fn bus_country(&self, bus_id: &BusID) -> Result<&CountryID> {
        let bus = self
            .buses
            .get(bus_id)
            .with_context(|| format!("Unknown bus {bus_id}"))?;
        bus.country
            .as_ref()
            .with_context(|| format!("Bus {bus_id} has no country"))
    }

    /// Check that the network is internally consistent.
    ///
    /// Every component must refer to existing buses and every time series must have one value per
    /// snapshot.
    pub fn validate(&self) -> Result<()> {
        let n = self.snapshots.len();
        ensure!(n > 0, "Network has no snapshots");

        let check_bus = |owner: &dyn std::fmt::Display, bus: &BusID| -> Result<()> {
            ensure!(
                self.buses.contains_key(bus),
                "{owner} is attached to unknown bus {bus}"
            );
            Ok(())
        };

        for generator in self.generators.values() {
            check_bus(generator.get_id(), &generator.bus)?;
            check_series_len(generator.get_id(), "p_max_pu", generator.p_max_pu_t.as_ref(), n)?;
            check_series_len(generator.get_id(), "p", generator.dispatch.as_ref(), n)?;
        }
        for unit in self.storage_units.values() {
            check_bus(unit.get_id(), &unit.bus)?;
            check_series_len(unit.get_id(), "inflow", unit.inflow.as_ref(), n)?;
            check_series_len(unit.get_id(), "state_of_charge", unit.state_of_charge.as_ref(), n)?;
            check_series_len(
                unit.get_id(),
                "mu_energy_balance",
                unit.mu_energy_balance.as_ref(),
                n,
            )?;
        }
        for store in self.stores.values() {
            check_bus(store.get_id(), &store.bus)?;
        }
        for line in self.lines.values() {
            check_bus(line.get_id(), &line.bus0)?;
            check_bus(line.get_id(), &line.bus1)?;
        }
        for link in self.links.values() {
            check_bus(link.get_id(), &link.bus0)?;
            check_bus(link.get_id(), &link.bus1)?;
        }
        for load in self.loads.values() {
            check_bus(load.get_id(), &load.bus)?;
            check_series_len(load.get_id(), "p_set", Some(&load.p_set), n)?;
        }

        Ok(())
    }
}

/// Check that a series attached to a component covers every snapshot
fn check_series_len<T: std::fmt::Display + ?Sized>(
    owner: &T,
    attribute: &str,
    series: Option<&crate::series::TimeSeries>,
    expected: usize,
) -> Result<()> {
    if let Some(series) = series {
        ensure!(
            series.len() == expected,
            "{attribute} series for {owner} has {} values but there are {expected} snapshots",
            series.len()
        );
    }

    Ok(())
}
