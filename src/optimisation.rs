//! Code for performing the capacity expansion and dispatch optimisation of a network.
//!
//! The network is formulated as a linear transport model and solved with HiGHS. The problem built
//! for a solve is retained as a [`LinearProblem`], so that further constraints can be added and the
//! problem re-solved without rebuilding it.
use crate::id::{GeneratorID, StorageUnitID};
use crate::network::{ConstraintSense, Network};
use crate::series::write_result;
use crate::units::{Capacity, Money};
use anyhow::{Result, ensure};
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexSet;
use log::{LevelFilter, debug};
use std::error::Error;
use std::fmt;
use std::ops::Range;

mod constraints;
use constraints::{ConstraintKeys, add_network_constraints};
mod rolling_horizon;
pub use rolling_horizon::optimise_with_rolling_horizon;
mod variables;
pub use variables::SeriesVariables;
use variables::{ColumnBuilder, VariableMap, add_variables};

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// An error from the solver
#[derive(Debug)]
pub enum ModelError {
    /// The model could not be passed to the solver or the solver failed to run
    Incoherent(HighsStatus),
    /// The solver finished without an optimal solution (e.g. the problem is infeasible)
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            Self::NonOptimal(status) => {
                write!(f, "Could not find optimal result for model: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Solve the model, returning an error unless the solution is optimal
pub fn solve_optimal(model: highs::Model) -> Result<highs::SolvedModel, ModelError> {
    let solved = model.try_solve().map_err(ModelError::Incoherent)?;

    match solved.status() {
        HighsModelStatus::Optimal => Ok(solved),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Options for a solve
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOptions {
    /// Whether to store the duals of the storage energy balance (`mu_energy_balance`)
    pub assign_all_duals: bool,
    /// Time limit for the solver in seconds
    pub time_limit: Option<f64>,
    /// Number of threads for the solver to use
    pub threads: Option<u32>,
}

impl SolveOptions {
    /// These options, but with duals assigned
    pub fn with_duals(&self) -> Self {
        Self {
            assign_all_duals: true,
            ..self.clone()
        }
    }

    /// Apply the options to a HiGHS model
    fn apply(&self, model: &mut highs::Model) {
        // Echo solver output to the terminal unless logging is switched off (e.g. in tests)
        if log::max_level() != LevelFilter::Off {
            model.set_option("log_to_console", true);
            model.set_option("output_flag", true);
        }
        if let Some(time_limit) = self.time_limit {
            model.set_option("time_limit", time_limit);
        }
        if let Some(threads) = self.threads {
            model.set_option("threads", i32::try_from(threads).unwrap_or(i32::MAX));
        }
    }
}

/// A row of a user-defined constraint
#[derive(Debug, Clone)]
pub struct CustomRow {
    /// The variables and their coefficients
    pub terms: Vec<(Variable, f64)>,
    /// The sense of the constraint
    pub sense: ConstraintSense,
    /// The right-hand side
    pub rhs: f64,
}

/// A linear problem built for (part of) a network, retained so it can be extended and re-solved
#[derive(Debug)]
pub struct LinearProblem {
    problem: Problem,
    costs: Vec<f64>,
    variables: VariableMap,
    constraint_keys: ConstraintKeys,
    custom_constraints: IndexSet<String>,
    snapshots: Range<usize>,
}

impl LinearProblem {
    /// Build the problem for the network over the snapshots in `snapshots`
    pub fn build(network: &Network, snapshots: Range<usize>) -> Result<Self> {
        ensure!(
            !snapshots.is_empty() && snapshots.end <= network.snapshots.len(),
            "Invalid snapshot range {snapshots:?} for network with {} snapshots",
            network.snapshots.len()
        );

        let mut problem = Problem::default();
        let mut columns = ColumnBuilder::new(&mut problem);
        let variables = add_variables(&mut columns, network, &snapshots);
        let costs = columns.into_costs();
        let constraint_keys =
            add_network_constraints(&mut problem, &variables, network, &snapshots)?;
        debug!(
            "Built problem for snapshots {snapshots:?} with {} variables and {} constraints",
            problem.num_cols(),
            problem.num_rows()
        );

        Ok(Self {
            problem,
            costs,
            variables,
            constraint_keys,
            custom_constraints: IndexSet::new(),
            snapshots,
        })
    }

    /// The snapshot indices covered by the problem
    pub fn snapshots(&self) -> Range<usize> {
        self.snapshots.clone()
    }

    /// Dispatch variables of a generator
    pub fn generator_dispatch(&self, id: &GeneratorID) -> Option<&SeriesVariables> {
        self.variables.generators.get(id).map(|vars| &vars.dispatch)
    }

    /// Spill variables of a storage unit, if it has an inflow
    pub fn storage_spill(&self, id: &StorageUnitID) -> Option<&SeriesVariables> {
        self.variables
            .storage_units
            .get(id)
            .and_then(|vars| vars.spill.as_ref())
    }

    /// Whether a custom constraint with this name has been added
    pub fn has_custom_constraint(&self, name: &str) -> bool {
        self.custom_constraints.contains(name)
    }

    /// Add a named group of custom constraints
    pub fn add_custom_constraints<I>(&mut self, name: &str, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = CustomRow>,
    {
        ensure!(
            self.custom_constraints.insert(name.to_string()),
            "Constraint {name} has already been added"
        );

        let mut count = 0;
        for row in rows {
            let (lower, upper) = row.sense.row_bounds(row.rhs);
            self.problem.add_row(lower..=upper, row.terms);
            count += 1;
        }
        debug!("Added {count} row(s) for constraint {name}");

        Ok(())
    }

    /// Solve the problem and write the results into `network`.
    ///
    /// The problem itself is left untouched, so it can be solved again after adding constraints.
    pub fn solve(&self, network: &mut Network, options: &SolveOptions) -> Result<()> {
        let mut model = self.problem.clone().optimise(Sense::Minimise);
        options.apply(&mut model);
        let solution = solve_optimal(model)?.get_solution();

        let columns = solution.columns();
        let objective: f64 = self
            .costs
            .iter()
            .zip(columns)
            .map(|(cost, value)| cost * value)
            .sum();
        debug!("Objective for snapshots {:?}: {objective}", self.snapshots);

        self.assign_results(network, columns);
        self.assign_duals(network, solution.dual_rows(), options.assign_all_duals);
        network.objective = Some(Money(objective));

        Ok(())
    }

    /// Write primal values into the network
    fn assign_results(&self, network: &mut Network, columns: &[f64]) {
        let len = network.snapshots.len();
        let offset = self.snapshots.start;

        for (id, vars) in &self.variables.generators {
            let generator = &mut network.generators[id];
            write_result(
                &mut generator.dispatch,
                len,
                offset,
                vars.dispatch.values(columns),
            );
            generator.capacity.optimal = Some(Capacity(vars.capacity.value(columns)));
        }

        for (id, vars) in &self.variables.storage_units {
            let unit = &mut network.storage_units[id];
            write_result(&mut unit.p_dispatch, len, offset, vars.dispatch.values(columns));
            write_result(&mut unit.p_store, len, offset, vars.store.values(columns));
            write_result(
                &mut unit.state_of_charge,
                len,
                offset,
                vars.state_of_charge.values(columns),
            );
            if let Some(spill) = &vars.spill {
                write_result(&mut unit.spill, len, offset, spill.values(columns));
            }
            unit.capacity.optimal = Some(Capacity(vars.capacity.value(columns)));
        }

        for (id, vars) in &self.variables.stores {
            let store = &mut network.stores[id];
            write_result(&mut store.energy, len, offset, vars.energy.values(columns));
            write_result(&mut store.power, len, offset, vars.power.values(columns));
            store.capacity.optimal = Some(Capacity(vars.capacity.value(columns)));
        }

        for (id, vars) in &self.variables.lines {
            let line = &mut network.lines[id];
            write_result(&mut line.flow, len, offset, vars.flow.values(columns));
            line.capacity.optimal = Some(Capacity(vars.capacity.value(columns)));
        }

        for (id, vars) in &self.variables.links {
            let link = &mut network.links[id];
            write_result(&mut link.flow, len, offset, vars.flow.values(columns));
            link.capacity.optimal = Some(Capacity(vars.capacity.value(columns)));
        }
    }

    /// Write prices into the network
    fn assign_duals(&self, network: &mut Network, duals: &[f64], assign_all_duals: bool) {
        let len = network.snapshots.len();

        for ((bus_id, k), dual) in self.constraint_keys.nodal_balance_keys.zip_duals(duals) {
            let weighting = network.snapshots.weightings()[*k].objective;
            let price = if weighting > 0.0 { dual / weighting } else { dual };
            let bus = &mut network.buses[bus_id];
            write_result(&mut bus.marginal_price, len, *k, &[price]);
        }

        if assign_all_duals {
            for ((unit_id, k), dual) in self.constraint_keys.storage_balance_keys.zip_duals(duals) {
                let unit = &mut network.storage_units[unit_id];
                write_result(&mut unit.mu_energy_balance, len, *k, &[dual]);
            }
        }
    }
}

/// Optimise the network over all of its snapshots, writing the results into it.
///
/// The problem is returned so that further constraints can be added and the network re-solved.
///
/// # Returns
///
/// The solved problem, or an error if the network could not be solved to optimality.
pub fn optimise(network: &mut Network, options: &SolveOptions) -> Result<LinearProblem> {
    let problem = LinearProblem::build(network, 0..network.snapshots.len())?;
    problem.solve(network, options)?;

    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, network, single_bus_network};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_optimise_single_bus(mut single_bus_network: Network) {
        optimise(&mut single_bus_network, &SolveOptions::default()).unwrap();

        // The cheaper generator runs first, the expensive one covers the rest
        let cheap = single_bus_network.generators["cheap"].dispatch.as_ref().unwrap();
        let dear = single_bus_network.generators["dear"].dispatch.as_ref().unwrap();
        assert_approx_eq!(f64, cheap[0], 50.0, epsilon = 1e-6);
        assert_approx_eq!(f64, dear[0], 30.0, epsilon = 1e-6);

        // The expensive generator sets the price
        let price = single_bus_network.buses[0].marginal_price.as_ref().unwrap();
        assert_approx_eq!(f64, price[0], 20.0, epsilon = 1e-6);

        // 4 snapshots of (50 * 10 + 30 * 20)
        let objective = single_bus_network.objective.unwrap();
        assert_approx_eq!(f64, objective.value(), 4400.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_optimise_extendable_capacity(mut single_bus_network: Network) {
        let generator = &mut single_bus_network.generators["dear"];
        generator.capacity = crate::network::CapacityLimits::extendable(
            Capacity(0.0),
            Capacity(f64::INFINITY),
        );
        generator.capital_cost = crate::units::MoneyPerCapacity(1.0);
        optimise(&mut single_bus_network, &SolveOptions::default()).unwrap();

        let capacity = single_bus_network.generators["dear"].capacity.optimal.unwrap();
        assert_approx_eq!(f64, capacity.value(), 30.0, epsilon = 1e-6);
    }

    #[rstest]
    fn test_optimise_infeasible(mut single_bus_network: Network) {
        for generator in single_bus_network.generators.values_mut() {
            generator.p_max_pu = 0.0;
        }
        let result = optimise(&mut single_bus_network, &SolveOptions::default());
        assert!(result.unwrap_err().downcast_ref::<ModelError>().is_some());
    }

    #[rstest]
    fn test_resolve_with_custom_constraint(mut single_bus_network: Network) {
        let mut problem = optimise(&mut single_bus_network, &SolveOptions::default()).unwrap();

        // Force the expensive generator to produce at least 40 in the first snapshot
        let var = problem.generator_dispatch(&"dear".into()).unwrap().get(0);
        let row = CustomRow {
            terms: vec![(var, 1.0)],
            sense: ConstraintSense::GreaterOrEqual,
            rhs: 40.0,
        };
        problem.add_custom_constraints("force", [row.clone()]).unwrap();
        problem
            .solve(&mut single_bus_network, &SolveOptions::default())
            .unwrap();
        let dear = single_bus_network.generators["dear"].dispatch.as_ref().unwrap();
        assert_approx_eq!(f64, dear[0], 40.0, epsilon = 1e-6);

        assert_error!(
            problem.add_custom_constraints("force", [row]),
            "Constraint force has already been added"
        );
    }

    #[rstest]
    fn test_optimise_storage_duals(mut network: Network) {
        optimise(&mut network, &SolveOptions::default().with_duals()).unwrap();

        let unit = &network.storage_units[0];
        let mu = unit.mu_energy_balance.as_ref().unwrap();
        assert_eq!(mu.len(), network.snapshots.len());
        assert!(mu.iter().all(|value| value >= -1e-6));

        let soc = unit.state_of_charge.as_ref().unwrap();
        let max_soc = unit.capacity.optimal.unwrap().value() * unit.max_hours;
        assert!(soc.iter().all(|value| value <= max_soc + 1e-6));
    }

    #[rstest]
    fn test_optimise_without_duals_keeps_previous(mut network: Network) {
        network.storage_units[0].mu_energy_balance = None;
        optimise(&mut network, &SolveOptions::default()).unwrap();
        assert!(network.storage_units[0].mu_energy_balance.is_none());
        assert!(network.buses[0].marginal_price.is_some());
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::NonOptimal(HighsModelStatus::Infeasible);
        assert_eq!(
            err.to_string(),
            "Could not find optimal result for model: Infeasible"
        );
    }
}
