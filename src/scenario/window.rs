//! Selection of the period of highest output, where a shortfall hurts most.
use crate::network::Network;
use crate::series::TimeSeries;
use crate::snapshot::Snapshots;
use crate::technology::Technology;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use indexmap::IndexSet;
use log::{debug, warn};

/// Find the start of the window of `days` days with the greatest summed output.
///
/// The series are summed per snapshot and every window fitting entirely within the snapshots is
/// considered. Only a window with a strictly positive sum can be selected and ties go to the
/// earliest window.
///
/// # Arguments
///
/// * `snapshots` - The snapshots over which the series are defined
/// * `series` - Output series, one value per snapshot
/// * `days` - Length of the window in days
///
/// # Returns
///
/// The timestamp of the first snapshot in the window, or `None` if there are too few snapshots or
/// no window has a positive sum.
pub fn find_max_output_window(
    snapshots: &Snapshots,
    series: &[&TimeSeries],
    days: u32,
) -> Option<NaiveDateTime> {
    let rows = snapshots.steps_for_days(days)?;
    let len = snapshots.len();
    if rows == 0 || rows > len {
        return None;
    }

    let totals: Vec<f64> = (0..len)
        .map(|k| series.iter().map(|values| values[k]).sum())
        .collect();

    let mut best = None;
    let mut max_output = 0.0;
    for start in 0..=len - rows {
        let output: f64 = totals[start..start + rows].iter().sum();
        if output > max_output {
            max_output = output;
            best = Some(start);
        }
    }

    best.map(|start| snapshots.timestamps()[start])
}

/// Get the dispatch series of every generator and storage unit with one of the given technologies.
///
/// Storage units contribute their net dispatch (output minus charging).
fn matching_dispatch(
    network: &Network,
    technologies: &IndexSet<Technology>,
) -> Result<Vec<TimeSeries>> {
    let mut series = Vec::new();
    for generator in network.generators.values() {
        if technologies.contains(&generator.technology) {
            let dispatch = generator
                .dispatch
                .as_ref()
                .with_context(|| format!("No dispatch found for generator {}", generator.id))?;
            series.push(dispatch.clone());
        }
    }

    for unit in network.storage_units.values() {
        if technologies.contains(&unit.technology) {
            let dispatch = unit
                .net_dispatch()
                .with_context(|| format!("No dispatch found for storage unit {}", unit.id))?;
            series.push(dispatch);
        }
    }

    Ok(series)
}

/// Select the start of the shortfall window from the solved dispatch of the affected technologies
pub fn select_shortfall_window(
    network: &Network,
    days: u32,
    technologies: &IndexSet<Technology>,
) -> Result<Option<NaiveDateTime>> {
    let series = matching_dispatch(network, technologies)?;
    debug!("Selecting window from {} dispatch series", series.len());
    if series.iter().any(|values| values.iter().any(|v| v < 0.0)) {
        warn!("Dispatch used for shortfall window selection contains negative values");
    }

    let refs: Vec<&TimeSeries> = series.iter().collect();
    Ok(find_max_output_window(&network.snapshots, &refs, days))
}
