//! Decision variables of the dispatch and capacity expansion problem.
use super::{Problem, Variable};
use crate::id::{GeneratorID, LineID, LinkID, StorageUnitID, StoreID};
use crate::network::{CapacityLimits, Network};
use crate::units::MoneyPerCapacity;
use indexmap::IndexMap;
use std::ops::Range;

/// One variable per snapshot of the optimised range, added as consecutive columns
#[derive(Debug)]
pub struct SeriesVariables {
    offset: usize,
    cols: Vec<Variable>,
}

impl SeriesVariables {
    /// The variable for the `j`th snapshot of the optimised range
    pub fn get(&self, j: usize) -> Variable {
        self.cols[j]
    }

    /// Iterate over the variables in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.cols.iter().copied()
    }

    /// The values of these variables in a solution
    pub fn values<'a>(&self, columns: &'a [f64]) -> &'a [f64] {
        &columns[self.offset..self.offset + self.cols.len()]
    }
}

/// A single variable, along with its column index
#[derive(Debug)]
pub struct ScalarVariable {
    index: usize,
    col: Variable,
}

impl ScalarVariable {
    /// The underlying variable
    pub fn col(&self) -> Variable {
        self.col
    }

    /// The value of this variable in a solution
    pub fn value(&self, columns: &[f64]) -> f64 {
        columns[self.index]
    }
}

/// Either a capacity variable or the fixed capacity of the asset
#[derive(Debug)]
pub enum CapacityTerm {
    /// The capacity is optimised
    Variable(ScalarVariable),
    /// The capacity is fixed at this value
    Fixed(f64),
}

impl CapacityTerm {
    /// The capacity variable, if the capacity is optimised
    pub fn variable(&self) -> Option<Variable> {
        match self {
            Self::Variable(var) => Some(var.col()),
            Self::Fixed(_) => None,
        }
    }

    /// The capacity in a solution
    pub fn value(&self, columns: &[f64]) -> f64 {
        match self {
            Self::Variable(var) => var.value(columns),
            Self::Fixed(value) => *value,
        }
    }
}

/// Variables for a generator
#[derive(Debug)]
pub struct GeneratorVariables {
    /// Power output
    pub dispatch: SeriesVariables,
    /// Capacity
    pub capacity: CapacityTerm,
}

/// Variables for a storage unit
#[derive(Debug)]
pub struct StorageUnitVariables {
    /// Power output to the bus
    pub dispatch: SeriesVariables,
    /// Power drawn from the bus
    pub store: SeriesVariables,
    /// Energy content
    pub state_of_charge: SeriesVariables,
    /// Spilled inflow, only present for units with an inflow series
    pub spill: Option<SeriesVariables>,
    /// Power capacity
    pub capacity: CapacityTerm,
}

/// Variables for a store
#[derive(Debug)]
pub struct StoreVariables {
    /// Energy content
    pub energy: SeriesVariables,
    /// Power output to the bus (negative when charging)
    pub power: SeriesVariables,
    /// Energy capacity
    pub capacity: CapacityTerm,
}

/// Variables for a line or link
#[derive(Debug)]
pub struct BranchVariables {
    /// Power flow from `bus0` to `bus1`
    pub flow: SeriesVariables,
    /// Capacity
    pub capacity: CapacityTerm,
}

/// All variables of the problem, indexed by asset
#[derive(Debug)]
pub struct VariableMap {
    /// Generator variables
    pub generators: IndexMap<GeneratorID, GeneratorVariables>,
    /// Storage unit variables
    pub storage_units: IndexMap<StorageUnitID, StorageUnitVariables>,
    /// Store variables
    pub stores: IndexMap<StoreID, StoreVariables>,
    /// Line variables
    pub lines: IndexMap<LineID, BranchVariables>,
    /// Link variables
    pub links: IndexMap<LinkID, BranchVariables>,
}

/// Adds columns to the problem while recording their objective coefficients
pub struct ColumnBuilder<'a> {
    problem: &'a mut Problem,
    costs: Vec<f64>,
}

impl<'a> ColumnBuilder<'a> {
    /// Create a builder for a problem with no columns yet
    pub fn new(problem: &'a mut Problem) -> Self {
        assert!(
            problem.num_cols() == 0,
            "Columns must be added through a single builder"
        );
        Self {
            problem,
            costs: Vec::new(),
        }
    }

    /// Add a column with the given cost and bounds
    fn column(&mut self, cost: f64, lower: f64, upper: f64) -> ScalarVariable {
        let index = self.problem.num_cols();
        let col = self.problem.add_column(cost, lower..=upper);
        self.costs.push(cost);
        ScalarVariable { index, col }
    }

    /// Add one column per snapshot, with costs and bounds given by `f` for each snapshot index
    fn series<F>(&mut self, range: &Range<usize>, mut f: F) -> SeriesVariables
    where
        F: FnMut(usize) -> (f64, f64, f64),
    {
        let offset = self.problem.num_cols();
        let cols = range
            .clone()
            .map(|k| {
                let (cost, lower, upper) = f(k);
                self.column(cost, lower, upper).col
            })
            .collect();

        SeriesVariables { offset, cols }
    }

    /// Add a capacity variable for an extendable asset
    fn capacity(
        &mut self,
        limits: &CapacityLimits,
        capital_cost: MoneyPerCapacity,
    ) -> CapacityTerm {
        if limits.extendable {
            let (min, max) = limits.bounds();
            CapacityTerm::Variable(self.column(capital_cost.value(), min.value(), max.value()))
        } else {
            CapacityTerm::Fixed(limits.nominal.value())
        }
    }

    /// The objective coefficients of all columns, in column order
    pub fn into_costs(self) -> Vec<f64> {
        self.costs
    }
}

/// Bounds for a variable limited to `[lower_pu, upper_pu]` times a capacity.
///
/// When the capacity is optimised the variable is left unbounded here and limited by constraints
/// instead.
fn per_unit_bounds(capacity: &CapacityTerm, lower_pu: f64, upper_pu: f64) -> (f64, f64) {
    match capacity {
        CapacityTerm::Variable(_) => (f64::NEG_INFINITY, f64::INFINITY),
        CapacityTerm::Fixed(nominal) => {
            let upper = upper_pu * nominal;
            ((lower_pu * nominal).min(upper), upper)
        }
    }
}

/// Add variables for every asset over the snapshots in `range`
pub fn add_variables(
    columns: &mut ColumnBuilder,
    network: &Network,
    range: &Range<usize>,
) -> VariableMap {
    let weightings = network.snapshots.weightings();

    let mut generators = IndexMap::new();
    for (id, generator) in &network.generators {
        let capacity = columns.capacity(&generator.capacity, generator.capital_cost);
        let dispatch = columns.series(range, |k| {
            let (lower, upper) =
                per_unit_bounds(&capacity, generator.p_min_pu, generator.availability(k));
            let cost = weightings[k].objective * generator.marginal_cost.value();
            (cost, lower, upper)
        });
        generators.insert(id.clone(), GeneratorVariables { dispatch, capacity });
    }

    let mut storage_units = IndexMap::new();
    for (id, unit) in &network.storage_units {
        let capacity = columns.capacity(&unit.capacity, unit.capital_cost);
        let dispatch = columns.series(range, |k| {
            let (lower, upper) = per_unit_bounds(&capacity, 0.0, unit.p_max_pu);
            let cost = weightings[k].objective * unit.marginal_cost.value();
            (cost, lower.max(0.0), upper)
        });
        let store = columns.series(range, |_| {
            let (lower, upper) = per_unit_bounds(&capacity, 0.0, -unit.p_min_pu);
            (0.0, lower.max(0.0), upper)
        });
        let state_of_charge = columns.series(range, |_| {
            let (lower, upper) = per_unit_bounds(&capacity, 0.0, unit.max_hours);
            (0.0, lower.max(0.0), upper)
        });
        let spill = unit.inflow.as_ref().map(|inflow| {
            columns.series(range, |k| (0.0, 0.0, inflow[k].max(0.0)))
        });
        storage_units.insert(
            id.clone(),
            StorageUnitVariables {
                dispatch,
                store,
                state_of_charge,
                spill,
                capacity,
            },
        );
    }

    let mut stores = IndexMap::new();
    for (id, store) in &network.stores {
        let capacity = columns.capacity(&store.capacity, store.capital_cost);
        let energy = columns.series(range, |_| {
            let (lower, upper) = per_unit_bounds(&capacity, 0.0, 1.0);
            (0.0, lower.max(0.0), upper)
        });
        let power = columns.series(range, |k| {
            let cost = weightings[k].objective * store.marginal_cost.value();
            (cost, f64::NEG_INFINITY, f64::INFINITY)
        });
        stores.insert(
            id.clone(),
            StoreVariables {
                energy,
                power,
                capacity,
            },
        );
    }

    let mut lines = IndexMap::new();
    for (id, line) in &network.lines {
        let capacity = columns.capacity(&line.capacity, line.capital_cost);
        let flow = columns.series(range, |_| {
            let (lower, upper) = per_unit_bounds(&capacity, -line.s_max_pu, line.s_max_pu);
            (0.0, lower, upper)
        });
        lines.insert(id.clone(), BranchVariables { flow, capacity });
    }

    let mut links = IndexMap::new();
    for (id, link) in &network.links {
        let capacity = columns.capacity(&link.capacity, link.capital_cost);
        let flow = columns.series(range, |k| {
            let (lower, upper) = per_unit_bounds(&capacity, link.p_min_pu, link.p_max_pu);
            let cost = weightings[k].objective * link.marginal_cost.value();
            (cost, lower, upper)
        });
        links.insert(id.clone(), BranchVariables { flow, capacity });
    }

    VariableMap {
        generators,
        storage_units,
        stores,
        lines,
        links,
    }
}
