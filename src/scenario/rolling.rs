//! Preparation of a network for operation with limited foresight.
use crate::network::Network;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result};
use log::debug;

/// Prepare storage units for a rolling-horizon solve.
///
/// Each storage unit is given a marginal cost equal to the mean water value (dual of its energy
/// balance) found in `full_horizon`, so that limited-foresight operation values stored energy the
/// way the perfect-foresight solution did. The initial state of charge is taken from the first
/// snapshot of `initial_state`, or of `full_horizon` if not given. The cyclic conditions are
/// dropped, as they cannot be enforced across chunks.
///
/// # Arguments
///
/// * `network` - The network to be solved with a rolling horizon
/// * `full_horizon` - The solved perfect-foresight network, with storage duals
/// * `initial_state` - A solved network giving the initial state of charge, if not `full_horizon`
pub fn prepare_rolling_horizon(
    network: &mut Network,
    full_horizon: &Network,
    initial_state: Option<&Network>,
) -> Result<()> {
    let initial_state = initial_state.unwrap_or(full_horizon);

    for (id, unit) in &mut network.storage_units {
        let duals = full_horizon
            .storage_units
            .get(id)
            .and_then(|unit| unit.mu_energy_balance.as_ref())
            .with_context(|| format!("No energy balance duals found for storage unit {id}"))?;
        let water_value = duals
            .mean()
            .with_context(|| format!("Energy balance duals for storage unit {id} are empty"))?;

        let soc = initial_state
            .storage_units
            .get(id)
            .and_then(|unit| unit.state_of_charge.as_ref())
            .and_then(|soc| soc.first())
            .with_context(|| format!("No state of charge found for storage unit {id}"))?;

        debug!("Storage unit {id}: water value {water_value}, initial state of charge {soc}");
        unit.marginal_cost = MoneyPerEnergy(water_value);
        unit.state_of_charge_initial = soc;
        unit.cyclic_state_of_charge = false;
        unit.cyclic_state_of_charge_per_period = false;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, solved_network};
    use crate::series::TimeSeries;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_prepare_rolling_horizon(solved_network: Network) {
        let mut network = solved_network.clone();
        prepare_rolling_horizon(&mut network, &solved_network, None).unwrap();

        for (id, unit) in &network.storage_units {
            let reference = &solved_network.storage_units[id];
            let mean = reference.mu_energy_balance.as_ref().unwrap().mean().unwrap();
            assert_approx_eq!(f64, unit.marginal_cost.value(), mean);
            assert_eq!(
                unit.state_of_charge_initial,
                reference.state_of_charge.as_ref().unwrap()[0]
            );
            assert!(!unit.cyclic_state_of_charge);
            assert!(!unit.cyclic_state_of_charge_per_period);
        }
    }

    #[rstest]
    fn test_prepare_rolling_horizon_separate_initial_state(solved_network: Network) {
        let mut initial = solved_network.clone();
        initial.storage_units[0].state_of_charge = Some(TimeSeries::constant(123.0, 28));

        let mut network = solved_network.clone();
        prepare_rolling_horizon(&mut network, &solved_network, Some(&initial)).unwrap();
        assert_eq!(network.storage_units[0].state_of_charge_initial, 123.0);
    }

    #[rstest]
    fn test_prepare_rolling_horizon_mean_water_value(solved_network: Network) {
        let mut full = solved_network.clone();
        full.storage_units[0].mu_energy_balance =
            Some(TimeSeries::new((0..28).map(f64::from).collect()));

        let mut network = solved_network.clone();
        prepare_rolling_horizon(&mut network, &full, None).unwrap();
        assert_approx_eq!(f64, network.storage_units[0].marginal_cost.value(), 13.5);
    }

    #[rstest]
    fn test_prepare_rolling_horizon_missing_duals(solved_network: Network) {
        let mut full = solved_network.clone();
        full.storage_units[0].mu_energy_balance = None;
        let id = full.storage_units[0].id.clone();

        let mut network = solved_network.clone();
        assert_error!(
            prepare_rolling_horizon(&mut network, &full, None),
            format!("No energy balance duals found for storage unit {id}")
        );
    }
}
