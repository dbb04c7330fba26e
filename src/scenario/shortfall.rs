//! Reduction of resource availability during a drought window.
use crate::network::{Generator, Network};
use crate::series::TimeSeries;
use crate::snapshot::SnapshotWindow;
use crate::technology::Technology;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

/// The fraction of availability remaining during a shortfall, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionFactor(f64);

impl ReductionFactor {
    /// Create a new factor, checking that it lies in `[0, 1]`
    pub fn new(value: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&value),
            "Reduction factor must be between 0 and 1, got {value}"
        );
        Ok(Self(value))
    }

    /// The factor as a number
    pub fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for ReductionFactor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .with_context(|| format!("Invalid reduction factor: {s}"))?;
        Self::new(value)
    }
}

impl fmt::Display for ReductionFactor {
    /// Formats like a decimal literal, always with a fractional part (e.g. `0.5`, `1.0`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// A reduction of availability applied to some technologies over a window
#[derive(Debug, Clone)]
pub struct Shortfall {
    /// The affected period
    pub window: SnapshotWindow,
    /// Fraction of availability remaining within the window
    pub factor: ReductionFactor,
    /// The affected technologies
    pub technologies: IndexSet<Technology>,
}

/// Get a generator's availability series, expanding the static value if there is no series
fn availability_series(generator: &Generator, len: usize) -> TimeSeries {
    generator
        .p_max_pu_t
        .clone()
        .unwrap_or_else(|| TimeSeries::constant(generator.p_max_pu, len))
}

/// Derive a generator's availability from its solved dispatch.
///
/// Returns `None` if the generator has no positive optimal capacity.
fn availability_from_dispatch(generator: &Generator) -> Result<Option<TimeSeries>> {
    let Some(capacity) = generator
        .capacity
        .optimal
        .filter(|capacity| capacity.is_positive())
    else {
        return Ok(None);
    };

    let dispatch = generator
        .dispatch
        .as_ref()
        .with_context(|| format!("No dispatch found for generator {}", generator.id))?;

    Ok(Some(dispatch.divided_by(capacity.value())))
}

/// Apply a shortfall to the network.
///
/// Storage inflows are scaled within the window when hydro is affected. Run-of-river and nuclear
/// generators have their availability scaled. Nuclear generators which were built in the solved
/// network first have their availability derived from their dispatch, so that the reduction
/// applies to what they actually produced.
pub fn apply_shortfall(network: &mut Network, shortfall: &Shortfall) -> Result<()> {
    let range = network.snapshots.window_range(&shortfall.window);
    let factor = shortfall.factor.value();
    let len = network.snapshots.len();
    info!(
        "Applying shortfall of {} to {} from {} to {} ({} snapshots)",
        shortfall.factor,
        shortfall.technologies.iter().join(", "),
        shortfall.window.start,
        shortfall.window.end,
        range.len()
    );

    if shortfall.technologies.contains(&Technology::Hydro) {
        for unit in network.storage_units.values_mut() {
            if let Some(inflow) = &unit.inflow {
                unit.inflow = Some(inflow.scaled_within(range.clone(), factor));
            }
        }
    }

    for generator in network.generators.values_mut() {
        let technology = &generator.technology;
        if !matches!(technology, Technology::Ror | Technology::Nuclear)
            || !shortfall.technologies.contains(technology)
        {
            continue;
        }

        let mut availability = availability_series(generator, len);
        if *technology == Technology::Nuclear {
            if let Some(derived) = availability_from_dispatch(generator)? {
                debug!("Deriving availability of {} from its dispatch", generator.id);
                availability = derived;
            }
        }
        generator.p_max_pu_t = Some(availability.scaled_within(range.clone(), factor));
    }

    Ok(())
}
