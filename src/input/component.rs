//! Static component tables.
//!
//! The row types here are shared by the reader and the writer so that an exported network can be
//! loaded again without loss.
use super::{collect_by_id, deserialise_bool, input_err_msg, read_csv, read_csv_optional};
use crate::id::{BusID, CarrierID, GeneratorID, LineID, LinkID, LoadID, StorageUnitID, StoreID};
use crate::network::{
    Bus, CapacityLimits, Carrier, ConstraintSense, Generator, GlobalConstraint,
    GlobalConstraintType, Line, Link, Load, Network, StorageUnit, Store,
};
use crate::series::TimeSeries;
use crate::snapshot::{SNAPSHOT_FORMAT, SnapshotWeighting, Snapshots, parse_snapshot};
use crate::technology::Technology;
use crate::units::{Capacity, Money, MoneyPerCapacity, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub(crate) const NETWORK_FILE_NAME: &str = "network.csv";
pub(crate) const SNAPSHOTS_FILE_NAME: &str = "snapshots.csv";
pub(crate) const CARRIERS_FILE_NAME: &str = "carriers.csv";
pub(crate) const BUSES_FILE_NAME: &str = "buses.csv";
pub(crate) const GENERATORS_FILE_NAME: &str = "generators.csv";
pub(crate) const STORAGE_UNITS_FILE_NAME: &str = "storage_units.csv";
pub(crate) const STORES_FILE_NAME: &str = "stores.csv";
pub(crate) const LINES_FILE_NAME: &str = "lines.csv";
pub(crate) const LINKS_FILE_NAME: &str = "links.csv";
pub(crate) const LOADS_FILE_NAME: &str = "loads.csv";
pub(crate) const GLOBAL_CONSTRAINTS_FILE_NAME: &str = "global_constraints.csv";

fn default_one() -> f64 {
    1.0
}

fn default_minus_one() -> f64 {
    -1.0
}

fn default_infinity() -> f64 {
    f64::INFINITY
}

fn default_true() -> bool {
    true
}

fn default_ac() -> String {
    "AC".to_string()
}

/// Build capacity limits from the columns shared by every expandable component
fn capacity_limits(
    nominal: f64,
    extendable: bool,
    min: f64,
    max: f64,
    optimal: Option<f64>,
) -> Result<CapacityLimits> {
    ensure!(
        min <= max,
        "Minimum capacity {min} is greater than maximum capacity {max}"
    );

    Ok(CapacityLimits {
        nominal: Capacity(nominal),
        extendable,
        min: Capacity(min),
        max: Capacity(max),
        optimal: optimal.map(Capacity),
    })
}

/// A row of `network.csv`
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct NetworkRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objective: Option<f64>,
}

/// A row of `snapshots.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct SnapshotRow {
    pub snapshot: String,
    #[serde(default = "default_one")]
    pub objective: f64,
    #[serde(default = "default_one")]
    pub stores: f64,
    #[serde(default = "default_one")]
    pub generators: f64,
}

/// A row of `carriers.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct CarrierRow {
    pub name: CarrierID,
    #[serde(default)]
    pub co2_emissions: f64,
}

/// A row of `buses.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct BusRow {
    pub name: BusID,
    #[serde(default = "default_ac")]
    pub carrier: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A row of `generators.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct GeneratorRow {
    pub name: GeneratorID,
    pub bus: BusID,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    #[serde(default)]
    pub p_nom_min: f64,
    #[serde(default = "default_infinity")]
    pub p_nom_max: f64,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default)]
    pub p_min_pu: f64,
    #[serde(default = "default_one")]
    pub p_max_pu: f64,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub capital_cost: f64,
    #[serde(default = "default_one")]
    pub efficiency: f64,
}

impl GeneratorRow {
    fn into_generator(self) -> Result<Generator> {
        let capacity = capacity_limits(
            self.p_nom,
            self.p_nom_extendable,
            self.p_nom_min,
            self.p_nom_max,
            self.p_nom_opt,
        )
        .with_context(|| format!("Invalid capacity for generator {}", self.name))?;
        ensure!(
            self.efficiency > 0.0,
            "Efficiency of generator {} must be positive",
            self.name
        );

        Ok(Generator {
            technology: Technology::resolve(&self.carrier, self.name.as_str()),
            carrier: self.carrier.into(),
            id: self.name,
            bus: self.bus,
            capacity,
            p_min_pu: self.p_min_pu,
            p_max_pu: self.p_max_pu,
            p_max_pu_t: None,
            marginal_cost: MoneyPerEnergy(self.marginal_cost),
            capital_cost: MoneyPerCapacity(self.capital_cost),
            efficiency: self.efficiency,
            dispatch: None,
        })
    }
}

impl From<&Generator> for GeneratorRow {
    fn from(generator: &Generator) -> Self {
        let capacity = &generator.capacity;
        Self {
            name: generator.id.clone(),
            bus: generator.bus.clone(),
            carrier: generator.carrier.to_string(),
            p_nom: capacity.nominal.value(),
            p_nom_extendable: capacity.extendable,
            p_nom_min: capacity.min.value(),
            p_nom_max: capacity.max.value(),
            p_nom_opt: capacity.optimal.map(Capacity::value),
            p_min_pu: generator.p_min_pu,
            p_max_pu: generator.p_max_pu,
            marginal_cost: generator.marginal_cost.value(),
            capital_cost: generator.capital_cost.value(),
            efficiency: generator.efficiency,
        }
    }
}

/// A row of `storage_units.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct StorageUnitRow {
    pub name: StorageUnitID,
    pub bus: BusID,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    #[serde(default)]
    pub p_nom_min: f64,
    #[serde(default = "default_infinity")]
    pub p_nom_max: f64,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default = "default_one")]
    pub max_hours: f64,
    #[serde(default = "default_one")]
    pub efficiency_store: f64,
    #[serde(default = "default_one")]
    pub efficiency_dispatch: f64,
    #[serde(default)]
    pub standing_loss: f64,
    #[serde(default = "default_minus_one")]
    pub p_min_pu: f64,
    #[serde(default = "default_one")]
    pub p_max_pu: f64,
    #[serde(default)]
    pub state_of_charge_initial: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub cyclic_state_of_charge: bool,
    #[serde(default = "default_true", deserialize_with = "deserialise_bool")]
    pub cyclic_state_of_charge_per_period: bool,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub capital_cost: f64,
}

impl StorageUnitRow {
    fn into_storage_unit(self) -> Result<StorageUnit> {
        let capacity = capacity_limits(
            self.p_nom,
            self.p_nom_extendable,
            self.p_nom_min,
            self.p_nom_max,
            self.p_nom_opt,
        )
        .with_context(|| format!("Invalid capacity for storage unit {}", self.name))?;
        ensure!(
            self.efficiency_store > 0.0 && self.efficiency_dispatch > 0.0,
            "Efficiencies of storage unit {} must be positive",
            self.name
        );
        ensure!(
            (0.0..1.0).contains(&self.standing_loss),
            "Standing loss of storage unit {} must be in [0, 1)",
            self.name
        );

        Ok(StorageUnit {
            technology: Technology::resolve(&self.carrier, self.name.as_str()),
            carrier: self.carrier.into(),
            id: self.name,
            bus: self.bus,
            capacity,
            max_hours: self.max_hours,
            efficiency_store: self.efficiency_store,
            efficiency_dispatch: self.efficiency_dispatch,
            standing_loss: self.standing_loss,
            p_min_pu: self.p_min_pu,
            p_max_pu: self.p_max_pu,
            state_of_charge_initial: self.state_of_charge_initial,
            cyclic_state_of_charge: self.cyclic_state_of_charge,
            cyclic_state_of_charge_per_period: self.cyclic_state_of_charge_per_period,
            marginal_cost: MoneyPerEnergy(self.marginal_cost),
            capital_cost: MoneyPerCapacity(self.capital_cost),
            inflow: None,
            p_dispatch: None,
            p_store: None,
            state_of_charge: None,
            spill: None,
            mu_energy_balance: None,
        })
    }
}

impl From<&StorageUnit> for StorageUnitRow {
    fn from(unit: &StorageUnit) -> Self {
        let capacity = &unit.capacity;
        Self {
            name: unit.id.clone(),
            bus: unit.bus.clone(),
            carrier: unit.carrier.to_string(),
            p_nom: capacity.nominal.value(),
            p_nom_extendable: capacity.extendable,
            p_nom_min: capacity.min.value(),
            p_nom_max: capacity.max.value(),
            p_nom_opt: capacity.optimal.map(Capacity::value),
            max_hours: unit.max_hours,
            efficiency_store: unit.efficiency_store,
            efficiency_dispatch: unit.efficiency_dispatch,
            standing_loss: unit.standing_loss,
            p_min_pu: unit.p_min_pu,
            p_max_pu: unit.p_max_pu,
            state_of_charge_initial: unit.state_of_charge_initial,
            cyclic_state_of_charge: unit.cyclic_state_of_charge,
            cyclic_state_of_charge_per_period: unit.cyclic_state_of_charge_per_period,
            marginal_cost: unit.marginal_cost.value(),
            capital_cost: unit.capital_cost.value(),
        }
    }
}

/// A row of `stores.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct StoreRow {
    pub name: StoreID,
    pub bus: BusID,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub e_nom: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub e_nom_extendable: bool,
    #[serde(default)]
    pub e_nom_min: f64,
    #[serde(default = "default_infinity")]
    pub e_nom_max: f64,
    #[serde(default)]
    pub e_nom_opt: Option<f64>,
    #[serde(default)]
    pub e_initial: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub e_cyclic: bool,
    #[serde(default)]
    pub standing_loss: f64,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub capital_cost: f64,
}

impl StoreRow {
    fn into_store(self) -> Result<Store> {
        let capacity = capacity_limits(
            self.e_nom,
            self.e_nom_extendable,
            self.e_nom_min,
            self.e_nom_max,
            self.e_nom_opt,
        )
        .with_context(|| format!("Invalid capacity for store {}", self.name))?;

        Ok(Store {
            technology: Technology::resolve(&self.carrier, self.name.as_str()),
            carrier: self.carrier.into(),
            id: self.name,
            bus: self.bus,
            capacity,
            e_initial: self.e_initial,
            e_cyclic: self.e_cyclic,
            standing_loss: self.standing_loss,
            marginal_cost: MoneyPerEnergy(self.marginal_cost),
            capital_cost: MoneyPerCapacity(self.capital_cost),
            energy: None,
            power: None,
        })
    }
}

impl From<&Store> for StoreRow {
    fn from(store: &Store) -> Self {
        let capacity = &store.capacity;
        Self {
            name: store.id.clone(),
            bus: store.bus.clone(),
            carrier: store.carrier.to_string(),
            e_nom: capacity.nominal.value(),
            e_nom_extendable: capacity.extendable,
            e_nom_min: capacity.min.value(),
            e_nom_max: capacity.max.value(),
            e_nom_opt: capacity.optimal.map(Capacity::value),
            e_initial: store.e_initial,
            e_cyclic: store.e_cyclic,
            standing_loss: store.standing_loss,
            marginal_cost: store.marginal_cost.value(),
            capital_cost: store.capital_cost.value(),
        }
    }
}

/// A row of `lines.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct LineRow {
    pub name: LineID,
    pub bus0: BusID,
    pub bus1: BusID,
    #[serde(default = "default_ac")]
    pub carrier: String,
    #[serde(default)]
    pub s_nom: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub s_nom_extendable: bool,
    #[serde(default)]
    pub s_nom_min: f64,
    #[serde(default = "default_infinity")]
    pub s_nom_max: f64,
    #[serde(default)]
    pub s_nom_opt: Option<f64>,
    #[serde(default = "default_one")]
    pub s_max_pu: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub capital_cost: f64,
}

impl LineRow {
    fn into_line(self) -> Result<Line> {
        let capacity = capacity_limits(
            self.s_nom,
            self.s_nom_extendable,
            self.s_nom_min,
            self.s_nom_max,
            self.s_nom_opt,
        )
        .with_context(|| format!("Invalid capacity for line {}", self.name))?;

        Ok(Line {
            technology: Technology::resolve(&self.carrier, self.name.as_str()),
            carrier: self.carrier.into(),
            id: self.name,
            bus0: self.bus0,
            bus1: self.bus1,
            capacity,
            s_max_pu: self.s_max_pu,
            length: self.length,
            capital_cost: MoneyPerCapacity(self.capital_cost),
            flow: None,
        })
    }
}

impl From<&Line> for LineRow {
    fn from(line: &Line) -> Self {
        let capacity = &line.capacity;
        Self {
            name: line.id.clone(),
            bus0: line.bus0.clone(),
            bus1: line.bus1.clone(),
            carrier: line.carrier.to_string(),
            s_nom: capacity.nominal.value(),
            s_nom_extendable: capacity.extendable,
            s_nom_min: capacity.min.value(),
            s_nom_max: capacity.max.value(),
            s_nom_opt: capacity.optimal.map(Capacity::value),
            s_max_pu: line.s_max_pu,
            length: line.length,
            capital_cost: line.capital_cost.value(),
        }
    }
}

/// A row of `links.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct LinkRow {
    pub name: LinkID,
    pub bus0: BusID,
    pub bus1: BusID,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: f64,
    #[serde(default, deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    #[serde(default)]
    pub p_nom_min: f64,
    #[serde(default = "default_infinity")]
    pub p_nom_max: f64,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default)]
    pub p_min_pu: f64,
    #[serde(default = "default_one")]
    pub p_max_pu: f64,
    #[serde(default = "default_one")]
    pub efficiency: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub marginal_cost: f64,
    #[serde(default)]
    pub capital_cost: f64,
}

impl LinkRow {
    fn into_link(self) -> Result<Link> {
        let capacity = capacity_limits(
            self.p_nom,
            self.p_nom_extendable,
            self.p_nom_min,
            self.p_nom_max,
            self.p_nom_opt,
        )
        .with_context(|| format!("Invalid capacity for link {}", self.name))?;
        ensure!(
            self.p_min_pu <= self.p_max_pu,
            "p_min_pu of link {} is greater than p_max_pu",
            self.name
        );

        Ok(Link {
            technology: Technology::resolve(&self.carrier, self.name.as_str()),
            carrier: self.carrier.into(),
            id: self.name,
            bus0: self.bus0,
            bus1: self.bus1,
            capacity,
            p_min_pu: self.p_min_pu,
            p_max_pu: self.p_max_pu,
            efficiency: self.efficiency,
            length: self.length,
            marginal_cost: MoneyPerEnergy(self.marginal_cost),
            capital_cost: MoneyPerCapacity(self.capital_cost),
            flow: None,
        })
    }
}

impl From<&Link> for LinkRow {
    fn from(link: &Link) -> Self {
        let capacity = &link.capacity;
        Self {
            name: link.id.clone(),
            bus0: link.bus0.clone(),
            bus1: link.bus1.clone(),
            carrier: link.carrier.to_string(),
            p_nom: capacity.nominal.value(),
            p_nom_extendable: capacity.extendable,
            p_nom_min: capacity.min.value(),
            p_nom_max: capacity.max.value(),
            p_nom_opt: capacity.optimal.map(Capacity::value),
            p_min_pu: link.p_min_pu,
            p_max_pu: link.p_max_pu,
            efficiency: link.efficiency,
            length: link.length,
            marginal_cost: link.marginal_cost.value(),
            capital_cost: link.capital_cost.value(),
        }
    }
}

/// A row of `loads.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct LoadRow {
    pub name: LoadID,
    pub bus: BusID,
    #[serde(default)]
    pub p_set: f64,
}

/// A row of `global_constraints.csv`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct GlobalConstraintRow {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GlobalConstraintType,
    pub sense: ConstraintSense,
    pub constant: f64,
    #[serde(default)]
    pub carrier_attribute: String,
}

impl From<GlobalConstraintRow> for GlobalConstraint {
    fn from(row: GlobalConstraintRow) -> Self {
        Self {
            name: row.name,
            kind: row.kind,
            sense: row.sense,
            constant: row.constant,
            carrier_attribute: row.carrier_attribute,
        }
    }
}

impl From<&GlobalConstraint> for GlobalConstraintRow {
    fn from(constraint: &GlobalConstraint) -> Self {
        Self {
            name: constraint.name.clone(),
            kind: constraint.kind,
            sense: constraint.sense,
            constant: constraint.constant,
            carrier_attribute: constraint.carrier_attribute.clone(),
        }
    }
}

/// Read the snapshots and their weightings
fn read_snapshots(network_dir: &Path) -> Result<Snapshots> {
    let file_path = network_dir.join(SNAPSHOTS_FILE_NAME);
    let rows = read_csv::<SnapshotRow>(&file_path)?;
    read_snapshots_from_iter(rows).with_context(|| input_err_msg(&file_path))
}

fn read_snapshots_from_iter<I>(iter: I) -> Result<Snapshots>
where
    I: Iterator<Item = SnapshotRow>,
{
    let mut timestamps = Vec::new();
    let mut weightings = Vec::new();
    for row in iter {
        timestamps.push(parse_snapshot(&row.snapshot)?);
        weightings.push(SnapshotWeighting {
            objective: row.objective,
            stores: row.stores,
            generators: row.generators,
        });
    }

    Snapshots::new(timestamps, weightings)
}

impl Snapshots {
    /// Rows for writing to `snapshots.csv`
    pub(crate) fn to_rows(&self) -> Vec<SnapshotRow> {
        self.iter()
            .map(|(timestamp, weighting)| SnapshotRow {
                snapshot: timestamp.format(SNAPSHOT_FORMAT).to_string(),
                objective: weighting.objective,
                stores: weighting.stores,
                generators: weighting.generators,
            })
            .collect()
    }
}

/// Read a component table, converting each row with `convert`
fn read_table<R, T, F>(file_path: &Path, required: bool, convert: F) -> Result<Vec<T>>
where
    R: serde::de::DeserializeOwned,
    F: FnMut(R) -> Result<T>,
{
    let rows: Vec<R> = if required {
        read_csv(file_path)?.collect()
    } else {
        read_csv_optional(file_path)?.collect()
    };

    rows.into_iter()
        .map(convert)
        .collect::<Result<Vec<_>>>()
        .with_context(|| input_err_msg(file_path))
}

/// Read all static component tables of a network.
///
/// Time-varying attributes are not read here and are left unset.
pub fn read_components(network_dir: &Path) -> Result<Network> {
    let snapshots = read_snapshots(network_dir)?;
    let n = snapshots.len();

    let meta = read_csv_optional::<NetworkRow>(&network_dir.join(NETWORK_FILE_NAME))?
        .next()
        .unwrap_or_default();
    let mut network = Network::new(&meta.name, snapshots);
    network.objective = meta.objective.map(Money);

    let carriers = read_table(&network_dir.join(CARRIERS_FILE_NAME), false, |row: CarrierRow| {
        Ok(Carrier {
            id: row.name,
            co2_emissions: row.co2_emissions,
        })
    })?;
    network.carriers = collect_by_id(carriers)?;

    let buses = read_table(&network_dir.join(BUSES_FILE_NAME), true, |row: BusRow| {
        Ok(Bus {
            id: row.name,
            carrier: row.carrier.into(),
            country: row.country.filter(|c| !c.is_empty()).map(Into::into),
            x: row.x,
            y: row.y,
            marginal_price: None,
        })
    })?;
    network.buses = collect_by_id(buses)?;

    let generators = read_table(
        &network_dir.join(GENERATORS_FILE_NAME),
        false,
        GeneratorRow::into_generator,
    )?;
    network.generators = collect_by_id(generators)?;

    let units = read_table(
        &network_dir.join(STORAGE_UNITS_FILE_NAME),
        false,
        StorageUnitRow::into_storage_unit,
    )?;
    network.storage_units = collect_by_id(units)?;

    let stores = read_table(
        &network_dir.join(STORES_FILE_NAME),
        false,
        StoreRow::into_store,
    )?;
    network.stores = collect_by_id(stores)?;

    let lines = read_table(&network_dir.join(LINES_FILE_NAME), false, LineRow::into_line)?;
    network.lines = collect_by_id(lines)?;

    let links = read_table(&network_dir.join(LINKS_FILE_NAME), false, LinkRow::into_link)?;
    network.links = collect_by_id(links)?;

    let loads = read_table(&network_dir.join(LOADS_FILE_NAME), false, |row: LoadRow| {
        Ok(Load {
            id: row.name,
            bus: row.bus,
            p_set: TimeSeries::constant(row.p_set, n),
        })
    })?;
    network.loads = collect_by_id(loads)?;

    let constraints = read_table(
        &network_dir.join(GLOBAL_CONSTRAINTS_FILE_NAME),
        false,
        |row: GlobalConstraintRow| Ok(GlobalConstraint::from(row)),
    )?;
    let mut global_constraints = IndexMap::new();
    for constraint in constraints {
        ensure!(
            !global_constraints.contains_key(&constraint.name),
            "Duplicate global constraint {} found",
            constraint.name
        );
        global_constraints.insert(constraint.name.clone(), constraint);
    }
    network.global_constraints = global_constraints;

    Ok(network)
}
