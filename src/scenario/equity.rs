//! Minimum self-supply ("equity") constraints.
//!
//! An equity constraint requires each country or node to produce at least a given share of the
//! electricity it consumes, on average over the modelled period.
use crate::id::BusID;
use crate::network::{ConstraintSense, Network};
use crate::optimisation::{CustomRow, LinearProblem, Variable};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use log::info;
use std::fmt;
use std::str::FromStr;

/// The name under which the constraint is added to the problem
pub const EQUITY_CONSTRAINT_NAME: &str = "equity_min";

/// Coefficients and right-hand side are scaled by this factor to improve conditioning
const SCALING: f64 = 0.1;

/// How loads and generation are grouped for the equity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquityGrouping {
    /// One constraint per country
    Country,
    /// One constraint per bus
    Node,
}

/// A parsed equity option, e.g. `EQ0.7c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityOption {
    /// Minimum share of consumption to be produced within each group, in `(0, 1]`
    pub level: f64,
    /// How to group buses
    pub grouping: EquityGrouping,
}

/// Find the first decimal number (`[0-9]*\.?[0-9]+`) in `s`
fn first_decimal(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }

        // Optional fractional part, which must have at least one digit
        if end < bytes.len() && bytes[end] == b'.' {
            let mut frac_end = end + 1;
            while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
                frac_end += 1;
            }
            if frac_end > end + 1 {
                return Some(&s[start..frac_end]);
            }
        }
        if end > start {
            return Some(&s[start..end]);
        }

        start += 1;
    }

    None
}

impl FromStr for EquityOption {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some(number) = first_decimal(s) else {
            bail!("No equity level found in option {s}");
        };
        let level: f64 = number
            .parse()
            .with_context(|| format!("Invalid equity level in option {s}"))?;
        ensure!(
            level > 0.0 && level <= 1.0,
            "Equity level must be greater than 0 and at most 1, got {level}"
        );

        let grouping = if s.ends_with('c') {
            EquityGrouping::Country
        } else {
            EquityGrouping::Node
        };

        Ok(Self { level, grouping })
    }
}

impl fmt::Display for EquityOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EQ{}", self.level)?;
        if self.grouping == EquityGrouping::Country {
            write!(f, "c")?;
        }
        Ok(())
    }
}

/// The terms and constants of the constraint for one group
#[derive(Default)]
struct EquityGroup {
    load: f64,
    inflow: f64,
    terms: Vec<(Variable, f64)>,
}

/// Get the group a bus belongs to
fn group_of(network: &Network, bus: &BusID, grouping: EquityGrouping) -> Result<String> {
    match grouping {
        EquityGrouping::Node => Ok(bus.to_string()),
        EquityGrouping::Country => Ok(network.bus_country(bus)?.to_string()),
    }
}

/// Add the equity constraint to a problem built for `network`.
///
/// For each group of loads, the weighted generation within the group minus the spilled inflow of
/// its storage units must be at least `level` times the weighted demand less the natural inflow.
/// Spill only enters the constraint if some storage unit has an inflow.
pub fn add_equity_constraint(
    problem: &mut LinearProblem,
    network: &Network,
    option: &EquityOption,
) -> Result<()> {
    let range = problem.snapshots();
    let weightings = &network.snapshots.weightings()[range.clone()];
    let mut groups: IndexMap<String, EquityGroup> = IndexMap::new();

    for load in network.loads.values() {
        let group = group_of(network, &load.bus, option.grouping)?;
        let demand: f64 = weightings
            .iter()
            .zip(range.clone())
            .map(|(w, k)| w.generators * load.p_set[k])
            .sum();
        groups.entry(group).or_default().load += demand;
    }

    let has_inflow = network.storage_units.values().any(|u| u.inflow.is_some());
    for unit in network.storage_units.values() {
        let Some(group) = groups.get_mut(&group_of(network, &unit.bus, option.grouping)?) else {
            continue;
        };
        if let Some(inflow) = &unit.inflow {
            group.inflow += weightings
                .iter()
                .zip(range.clone())
                .map(|(w, k)| w.stores * inflow[k])
                .sum::<f64>();
        }
        if !has_inflow {
            continue;
        }
        if let Some(spill) = problem.storage_spill(&unit.id) {
            for (j, w) in weightings.iter().enumerate() {
                group.terms.push((spill.get(j), -SCALING * w.stores));
            }
        }
    }

    for generator in network.generators.values() {
        let Some(group) = groups.get_mut(&group_of(network, &generator.bus, option.grouping)?)
        else {
            continue;
        };
        let dispatch = problem
            .generator_dispatch(&generator.id)
            .with_context(|| format!("No dispatch variables for generator {}", generator.id))?;
        for (j, w) in weightings.iter().enumerate() {
            group.terms.push((dispatch.get(j), SCALING * w.generators));
        }
    }

    let num_groups = groups.len();
    info!("Adding equity constraint {option} for {num_groups} group(s)");
    let rows = groups
        .into_values()
        .map(|group| CustomRow {
            terms: group.terms,
            sense: ConstraintSense::GreaterOrEqual,
            rhs: SCALING * (option.level * group.load - group.inflow),
        })
        .collect::<Vec<_>>();
    problem.add_custom_constraints(EQUITY_CONSTRAINT_NAME, rows)
}
