//! Code for adding constraints to the dispatch and capacity expansion problem.
use super::Problem;
use super::variables::{CapacityTerm, SeriesVariables, VariableMap};
use crate::id::{BusID, StorageUnitID};
use crate::network::{GlobalConstraint, GlobalConstraintType, Network};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use std::ops::Range;

/// Corresponding variables for a constraint along with the row offset in the solution
#[derive(Debug)]
pub struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }
}

/// Indicates the bus and snapshot covered by each nodal balance constraint
pub type NodalBalanceKeys = KeysWithOffset<(BusID, usize)>;

/// Indicates the storage unit and snapshot covered by each energy balance constraint
pub type StorageBalanceKeys = KeysWithOffset<(StorageUnitID, usize)>;

/// The keys for constraints whose duals are reported
#[derive(Debug)]
pub struct ConstraintKeys {
    /// Keys for nodal balance constraints
    pub nodal_balance_keys: NodalBalanceKeys,
    /// Keys for storage unit energy balance constraints
    pub storage_balance_keys: StorageBalanceKeys,
}

/// Add all constraints of the problem.
///
/// Note: the ordering of constraints is important, as the nodal balance constraints must come
/// first.
pub fn add_network_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) -> Result<ConstraintKeys> {
    let nodal_balance_keys = add_nodal_balance_constraints(problem, variables, network, range);
    add_capacity_constraints(problem, variables, network, range);
    let storage_balance_keys =
        add_storage_balance_constraints(problem, variables, network, range);
    add_store_balance_constraints(problem, variables, network, range);
    for constraint in network.global_constraints.values() {
        add_global_constraint(problem, variables, network, range, constraint)?;
    }

    Ok(ConstraintKeys {
        nodal_balance_keys,
        storage_balance_keys,
    })
}

/// Add energy balance constraints for every bus and snapshot.
///
/// Supply from generators, storage, stores and incoming branches must equal the demand of loads
/// at the bus plus outgoing branch flows.
fn add_nodal_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) -> NodalBalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();
    assert!(
        offset == 0,
        "Nodal balance constraints must be added before other constraints"
    );

    // Terms attached to each bus, as (series, coefficient)
    let mut bus_terms: IndexMap<&BusID, Vec<(&SeriesVariables, f64)>> =
        network.buses.keys().map(|id| (id, Vec::new())).collect();
    let mut attach = |bus: &BusID, series, coeff| {
        if let Some(terms) = bus_terms.get_mut(bus) {
            terms.push((series, coeff));
        }
    };
    for (id, vars) in &variables.generators {
        attach(&network.generators[id].bus, &vars.dispatch, 1.0);
    }
    for (id, vars) in &variables.storage_units {
        let bus = &network.storage_units[id].bus;
        attach(bus, &vars.dispatch, 1.0);
        attach(bus, &vars.store, -1.0);
    }
    for (id, vars) in &variables.stores {
        attach(&network.stores[id].bus, &vars.power, 1.0);
    }
    for (id, vars) in &variables.lines {
        let line = &network.lines[id];
        attach(&line.bus0, &vars.flow, -1.0);
        attach(&line.bus1, &vars.flow, 1.0);
    }
    for (id, vars) in &variables.links {
        let link = &network.links[id];
        attach(&link.bus0, &vars.flow, -1.0);
        attach(&link.bus1, &vars.flow, link.efficiency);
    }

    let mut keys = Vec::new();
    for (bus_id, terms) in bus_terms {
        let loads = network
            .loads
            .values()
            .filter(|load| &load.bus == bus_id)
            .collect_vec();
        for (j, k) in range.clone().enumerate() {
            let demand: f64 = loads.iter().map(|load| load.p_set[k]).sum();
            problem.add_row(
                demand..=demand,
                terms.iter().map(|(series, coeff)| (series.get(j), *coeff)),
            );
            keys.push((bus_id.clone(), k));
        }
    }

    NodalBalanceKeys { offset, keys }
}

/// Limit a variable to `per_unit` times an optimised capacity.
///
/// Nothing is added for fixed capacities, which are handled by the variable bounds.
fn add_per_unit_rows(
    problem: &mut Problem,
    series: &SeriesVariables,
    capacity: &CapacityTerm,
    range: &Range<usize>,
    per_unit: impl Fn(usize) -> f64,
    is_upper: bool,
) {
    let Some(cap) = capacity.variable() else {
        return;
    };

    for (j, k) in range.clone().enumerate() {
        let terms = [(series.get(j), 1.0), (cap, -per_unit(k))];
        if is_upper {
            problem.add_row(..=0.0, terms);
        } else {
            problem.add_row(0.0.., terms);
        }
    }
}

/// Add availability limits for assets whose capacity is optimised
fn add_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) {
    for (id, vars) in &variables.generators {
        let generator = &network.generators[id];
        let (dispatch, capacity) = (&vars.dispatch, &vars.capacity);
        add_per_unit_rows(problem, dispatch, capacity, range, |k| generator.availability(k), true);
        add_per_unit_rows(problem, dispatch, capacity, range, |_| generator.p_min_pu, false);
    }

    for (id, vars) in &variables.storage_units {
        let unit = &network.storage_units[id];
        let capacity = &vars.capacity;
        add_per_unit_rows(problem, &vars.dispatch, capacity, range, |_| unit.p_max_pu, true);
        add_per_unit_rows(problem, &vars.store, capacity, range, |_| -unit.p_min_pu, true);
        add_per_unit_rows(
            problem,
            &vars.state_of_charge,
            capacity,
            range,
            |_| unit.max_hours,
            true,
        );
    }

    for vars in variables.stores.values() {
        add_per_unit_rows(problem, &vars.energy, &vars.capacity, range, |_| 1.0, true);
    }

    for (id, vars) in &variables.lines {
        let s_max_pu = network.lines[id].s_max_pu;
        add_per_unit_rows(problem, &vars.flow, &vars.capacity, range, |_| s_max_pu, true);
        add_per_unit_rows(problem, &vars.flow, &vars.capacity, range, |_| -s_max_pu, false);
    }

    for (id, vars) in &variables.links {
        let link = &network.links[id];
        add_per_unit_rows(problem, &vars.flow, &vars.capacity, range, |_| link.p_max_pu, true);
        add_per_unit_rows(problem, &vars.flow, &vars.capacity, range, |_| link.p_min_pu, false);
    }
}

/// Add the energy balance of every storage unit.
///
/// In each snapshot `t` with elapsed hours `w`:
///
/// ```text
/// -soc(t) + (1 - standing_loss)^w soc(t-1) + w eff_store store(t) - w / eff_dispatch dispatch(t)
///     - w spill(t) = -w inflow(t)
/// ```
///
/// The orientation makes the dual a positive value of stored energy. The first snapshot couples to
/// the last one for cyclic units and to the initial state of charge otherwise.
fn add_storage_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) -> StorageBalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();
    let weightings = network.snapshots.weightings();
    let last = range.len() - 1;

    let mut keys = Vec::new();
    for (id, vars) in &variables.storage_units {
        let unit = &network.storage_units[id];
        let soc = &vars.state_of_charge;
        for (j, k) in range.clone().enumerate() {
            let hours = weightings[k].stores;
            let retained = (1.0 - unit.standing_loss).powf(hours);
            let inflow = unit.inflow.as_ref().map_or(0.0, |inflow| inflow[k]);
            let mut rhs = -hours * inflow;

            let mut terms = vec![
                (soc.get(j), -1.0),
                (vars.store.get(j), hours * unit.efficiency_store),
                (vars.dispatch.get(j), -hours / unit.efficiency_dispatch),
            ];
            if let Some(spill) = &vars.spill {
                terms.push((spill.get(j), -hours));
            }
            if j > 0 {
                terms.push((soc.get(j - 1), retained));
            } else if unit.cyclic_state_of_charge {
                terms.push((soc.get(last), retained));
            } else {
                rhs -= retained * unit.state_of_charge_initial;
            }

            problem.add_row(rhs..=rhs, terms);
            keys.push((id.clone(), k));
        }
    }

    StorageBalanceKeys { offset, keys }
}

/// Add the energy balance of every store: `e(t) - (1 - standing_loss)^w e(t-1) + w p(t) = 0`
fn add_store_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) {
    let weightings = network.snapshots.weightings();
    let last = range.len() - 1;

    for (id, vars) in &variables.stores {
        let store = &network.stores[id];
        for (j, k) in range.clone().enumerate() {
            let hours = weightings[k].stores;
            let retained = (1.0 - store.standing_loss).powf(hours);
            let mut rhs = 0.0;

            let mut terms = vec![(vars.energy.get(j), 1.0), (vars.power.get(j), hours)];
            if j > 0 {
                terms.push((vars.energy.get(j - 1), -retained));
            } else if store.e_cyclic {
                terms.push((vars.energy.get(last), -retained));
            } else {
                rhs = retained * store.e_initial;
            }

            problem.add_row(rhs..=rhs, terms);
        }
    }
}

/// Add a network-wide constraint
fn add_global_constraint(
    problem: &mut Problem,
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
    constraint: &GlobalConstraint,
) -> Result<()> {
    let (terms, fixed) = match constraint.kind {
        GlobalConstraintType::TransmissionVolumeExpansionLimit => {
            transmission_volume_terms(variables, network, &constraint.carrier_attribute)
        }
        GlobalConstraintType::PrimaryEnergy => {
            ensure!(
                constraint.carrier_attribute == "co2_emissions",
                "Unsupported carrier attribute {} for global constraint {}",
                constraint.carrier_attribute,
                constraint.name
            );
            (primary_energy_terms(variables, network, range), 0.0)
        }
    };

    if terms.is_empty() {
        debug!(
            "Global constraint {} has no variable terms; skipping",
            constraint.name
        );
        return Ok(());
    }

    let (lower, upper) = constraint.sense.row_bounds(constraint.constant - fixed);
    problem.add_row(lower..=upper, terms);

    Ok(())
}

/// Terms for capacity times length over lines and links of the given carriers.
///
/// Returns the terms for optimised capacities and the total for fixed ones.
fn transmission_volume_terms(
    variables: &VariableMap,
    network: &Network,
    carrier_attribute: &str,
) -> (Vec<(super::Variable, f64)>, f64) {
    let carriers: Vec<&str> = carrier_attribute.split(',').map(str::trim).collect();
    let mut terms = Vec::new();
    let mut fixed = 0.0;
    let mut add = |carrier: &str, length: f64, capacity: &CapacityTerm| {
        if !carriers.contains(&carrier) {
            return;
        }
        match capacity {
            CapacityTerm::Variable(var) => terms.push((var.col(), length)),
            CapacityTerm::Fixed(value) => fixed += length * value,
        }
    };

    for (id, vars) in &variables.lines {
        let line = &network.lines[id];
        add(line.carrier.as_str(), line.length, &vars.capacity);
    }
    for (id, vars) in &variables.links {
        let link = &network.links[id];
        add(link.carrier.as_str(), link.length, &vars.capacity);
    }

    (terms, fixed)
}

/// Terms for the CO2 emissions of generators over the optimised snapshots
fn primary_energy_terms(
    variables: &VariableMap,
    network: &Network,
    range: &Range<usize>,
) -> Vec<(super::Variable, f64)> {
    let weightings = network.snapshots.weightings();
    let mut terms = Vec::new();
    for (id, vars) in &variables.generators {
        let generator = &network.generators[id];
        let emissions = network
            .carriers
            .get(&generator.carrier)
            .map_or(0.0, |carrier| carrier.co2_emissions);
        if emissions == 0.0 {
            continue;
        }

        for (j, k) in range.clone().enumerate() {
            let coeff = weightings[k].generators * emissions / generator.efficiency;
            terms.push((vars.dispatch.get(j), coeff));
        }
    }

    terms
}
