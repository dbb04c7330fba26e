//! Optimisation with limited foresight, one chunk of snapshots at a time.
use super::{LinearProblem, SolveOptions};
use crate::network::Network;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use log::info;
use std::ops::Range;

/// The snapshot ranges optimised in turn
fn chunk_ranges(len: usize, horizon: usize, overlap: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(horizon - overlap)
        .map(|start| start..(start + horizon).min(len))
        .collect()
}

/// Take initial storage levels from the solution at the snapshot preceding `start`
fn carry_over_state(network: &mut Network, start: usize) -> Result<()> {
    let previous = start - 1;
    for unit in network.storage_units.values_mut() {
        let soc = unit
            .state_of_charge
            .as_ref()
            .with_context(|| format!("No state of charge found for storage unit {}", unit.id))?;
        unit.state_of_charge_initial = soc[previous];
    }
    for store in network.stores.values_mut() {
        let energy = store
            .energy
            .as_ref()
            .with_context(|| format!("No energy level found for store {}", store.id))?;
        store.e_initial = energy[previous];
    }

    Ok(())
}

/// Optimise the network with a rolling horizon.
///
/// Chunks of `horizon` snapshots are optimised in sequence, each starting `horizon - overlap`
/// snapshots after the previous one. Later chunks overwrite the results of earlier ones where they
/// overlap. Each chunk after the first starts from the storage levels reached by the previous
/// chunk's solution. The objective of the network is the sum of the chunk objectives.
///
/// # Arguments
///
/// * `network` - The network to optimise, into which results are written
/// * `horizon` - Number of snapshots in each chunk
/// * `overlap` - Number of snapshots shared by consecutive chunks (less than `horizon`)
/// * `options` - Options passed to the solver for every chunk
pub fn optimise_with_rolling_horizon(
    network: &mut Network,
    horizon: usize,
    overlap: usize,
    options: &SolveOptions,
) -> Result<()> {
    ensure!(horizon > 0, "Rolling horizon must be at least one snapshot");
    ensure!(
        overlap < horizon,
        "Rolling horizon overlap ({overlap}) must be less than the horizon ({horizon})"
    );

    let chunks = chunk_ranges(network.snapshots.len(), horizon, overlap);
    let mut objective = 0.0;
    for (i, range) in chunks.iter().enumerate() {
        if i > 0 {
            carry_over_state(network, range.start)?;
        }

        info!(
            "Optimising snapshots {} to {} ({}/{})",
            range.start,
            range.end - 1,
            i + 1,
            chunks.len()
        );
        let problem = LinearProblem::build(network, range.clone())?;
        problem.solve(network, options).with_context(|| {
            format!(
                "Failed to optimise snapshots {} to {}",
                range.start,
                range.end - 1
            )
        })?;
        objective += network.objective.map_or(0.0, |value| value.value());
    }
    network.objective = Some(Money(objective));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, network, single_bus_network};
    use crate::optimisation::optimise;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(10, 4, 0, vec![0..4, 4..8, 8..10])]
    #[case(10, 4, 2, vec![0..4, 2..6, 4..8, 6..10, 8..10])]
    #[case(3, 5, 0, vec![0..3])]
    fn test_chunk_ranges(
        #[case] len: usize,
        #[case] horizon: usize,
        #[case] overlap: usize,
        #[case] expected: Vec<Range<usize>>,
    ) {
        assert_eq!(chunk_ranges(len, horizon, overlap), expected);
    }

    #[rstest]
    fn test_bad_overlap(mut network: Network) {
        assert_error!(
            optimise_with_rolling_horizon(&mut network, 4, 4, &SolveOptions::default()),
            "Rolling horizon overlap (4) must be less than the horizon (4)"
        );
        assert_error!(
            optimise_with_rolling_horizon(&mut network, 0, 0, &SolveOptions::default()),
            "Rolling horizon must be at least one snapshot"
        );
    }

    #[rstest]
    fn test_rolling_matches_perfect_foresight_without_storage(mut single_bus_network: Network) {
        let mut perfect = single_bus_network.clone();
        optimise(&mut perfect, &SolveOptions::default()).unwrap();
        optimise_with_rolling_horizon(&mut single_bus_network, 1, 0, &SolveOptions::default())
            .unwrap();

        assert_approx_eq!(
            f64,
            single_bus_network.objective.unwrap().value(),
            perfect.objective.unwrap().value(),
            epsilon = 1e-6
        );
        let rolling = single_bus_network.generators["cheap"].dispatch.as_ref().unwrap();
        let perfect = perfect.generators["cheap"].dispatch.as_ref().unwrap();
        for (a, b) in rolling.iter().zip(perfect.iter()) {
            assert_approx_eq!(f64, a, b, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_rolling_carries_state_of_charge(mut network: Network) {
        for unit in network.storage_units.values_mut() {
            unit.cyclic_state_of_charge = false;
        }
        optimise_with_rolling_horizon(&mut network, 7, 0, &SolveOptions::default().with_duals())
            .unwrap();

        let unit = &network.storage_units[0];
        let soc = unit.state_of_charge.as_ref().unwrap();
        assert_eq!(soc.len(), network.snapshots.len());
        // Initial state is taken from the end of the penultimate chunk
        assert_approx_eq!(f64, unit.state_of_charge_initial, soc[20]);
    }
}
