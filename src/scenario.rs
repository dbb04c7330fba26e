//! Drought scenarios derived from a solved base network.
//!
//! A base scenario is optimised with perfect foresight and then operated with a rolling horizon
//! at the optimised capacities. A drought scenario starts from the solved base network, cuts the
//! availability of drought-sensitive technologies during the period in which they produce most,
//! and is then re-optimised with or without further investment, again followed by a rolling
//! horizon run.
use crate::network::Network;
use crate::optimisation::{optimise, optimise_with_rolling_horizon};
use crate::output::statistics::write_statistics;
use crate::settings::Settings;
use crate::snapshot::SnapshotWindow;
use crate::technology::Technology;
use crate::units::MoneyPerEnergy;
use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

pub mod capacity;
pub use capacity::{InvestmentPolicy, freeze_capacities, propagate_capacities, unlock_capacities};
pub mod equity;
pub use equity::{EquityGrouping, EquityOption, add_equity_constraint};
pub mod rolling;
pub use rolling::prepare_rolling_horizon;
pub mod shortfall;
pub use shortfall::{ReductionFactor, Shortfall, apply_shortfall};
pub mod window;
pub use window::{find_max_output_window, select_shortfall_window};

/// Parameters of a base scenario
#[derive(Debug, Clone)]
pub struct BaseScenario {
    /// Price of CO2 emissions (per tonne)
    pub co2_price: f64,
    /// Number of snapshots optimised at once in the rolling horizon run
    pub horizon: usize,
    /// Minimum self-supply requirement
    pub equity: EquityOption,
    /// The focus country, used to attribute cross-border lines and links
    pub country: String,
    /// Label of the transmission expansion limit, used in scenario names
    pub tl: String,
}

impl BaseScenario {
    /// The name of the perfect-foresight network
    pub fn solved_name(&self) -> String {
        format!("{}_{}_base_solved", self.country, self.tl)
    }

    /// The name of the rolling horizon network
    pub fn rolling_name(&self) -> String {
        format!("{}_{}_base_roll_solved", self.country, self.tl)
    }
}

/// Parameters of a drought scenario
#[derive(Debug, Clone)]
pub struct DroughtScenario {
    /// Label of the contingency, used in scenario names
    pub contingency: String,
    /// Fraction of availability remaining during the drought
    pub reduction: ReductionFactor,
    /// Length of the drought in days
    pub duration: u32,
    /// Whether new capacity may be built in response to the drought
    pub policy: InvestmentPolicy,
    /// Number of snapshots optimised at once in the rolling horizon run
    pub horizon: usize,
    /// The focus country, used to attribute cross-border lines and links
    pub country: String,
    /// Minimum self-supply requirement, applied when investment is allowed
    pub equity: EquityOption,
    /// Label of the transmission expansion limit, used in scenario names
    pub tl: String,
    /// Label of the bus configuration, used in scenario names
    pub bus: String,
}

impl DroughtScenario {
    /// The name of the perfect-foresight network
    pub fn solved_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}",
            self.contingency,
            self.country,
            self.bus,
            self.tl,
            self.reduction,
            self.duration,
            self.policy
        )
    }

    /// The name of the rolling horizon network
    pub fn rolling_name(&self) -> String {
        format!("{}roll", self.solved_name())
    }
}

/// The two solved networks of a scenario
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Solved with perfect foresight
    pub solved: Network,
    /// Solved with a rolling horizon at fixed capacities
    pub rolling: Network,
}

/// Set the marginal cost of load shedding generators
fn set_load_shedding_cost(network: &mut Network, cost: f64) {
    for generator in network.generators.values_mut() {
        if generator.technology == Technology::LoadShedding {
            generator.marginal_cost = MoneyPerEnergy(cost);
        }
    }
}

/// Add the cost of CO2 emissions to the marginal cost of generators.
///
/// The cost of a generator rises by `co2_price * co2_emissions / efficiency`, using the emissions
/// of its carrier. A price of zero leaves the network unchanged.
fn apply_co2_price(network: &mut Network, co2_price: f64) -> Result<()> {
    if co2_price == 0.0 {
        return Ok(());
    }

    for generator in network.generators.values_mut() {
        let carrier = network
            .carriers
            .get(&generator.carrier)
            .with_context(|| {
                format!("Unknown carrier {} for {}", generator.carrier, generator.id)
            })?;
        if carrier.co2_emissions != 0.0 {
            generator.marginal_cost +=
                MoneyPerEnergy(co2_price * carrier.co2_emissions / generator.efficiency);
        }
    }

    Ok(())
}

/// Solve the base scenario.
///
/// Statistics for both networks are written to the results folder.
///
/// # Arguments
///
/// * `network` - The unsolved network
/// * `scenario` - Parameters of the scenario
/// * `settings` - Program settings
///
/// # Returns
///
/// The perfect-foresight and rolling horizon solutions, or an error if either could not be solved.
pub fn solve_base(
    mut network: Network,
    scenario: &BaseScenario,
    settings: &Settings,
) -> Result<ScenarioOutcome> {
    let options = settings.solve_options();
    set_load_shedding_cost(&mut network, settings.load_shedding_cost);
    apply_co2_price(&mut network, scenario.co2_price)?;

    info!("Optimising base network");
    let mut problem = optimise(&mut network, &options)?;
    add_equity_constraint(&mut problem, &network, &scenario.equity)?;
    info!("Re-optimising base network with equity constraint");
    problem.solve(&mut network, &options.with_duals())?;
    network.name = scenario.solved_name();
    write_statistics(&network, &settings.results_dir, &scenario.country, None)?;

    let mut rolling = network.clone();
    rolling.name = scenario.rolling_name();
    freeze_capacities(&mut rolling, &network)?;
    prepare_rolling_horizon(&mut rolling, &network, None)?;
    info!("Optimising base network with rolling horizon");
    optimise_with_rolling_horizon(
        &mut rolling,
        scenario.horizon,
        settings.rolling_horizon_overlap,
        &options.with_duals(),
    )?;
    write_statistics(
        &rolling,
        &settings.results_dir,
        &scenario.country,
        Some(&network),
    )?;

    Ok(ScenarioOutcome {
        solved: network,
        rolling,
    })
}

/// Find the drought window and cut availability within it
fn inject_drought(
    network: &mut Network,
    base: &Network,
    scenario: &DroughtScenario,
    settings: &Settings,
) -> Result<()> {
    let technologies = settings.shortfall_technologies();
    let start = select_shortfall_window(base, scenario.duration, &technologies)?
        .with_context(|| {
            format!(
                "Could not find a {}-day window with output from {}",
                scenario.duration,
                technologies.iter().join(", ")
            )
        })?;

    let shortfall = Shortfall {
        window: SnapshotWindow::from_start_and_days(start, scenario.duration),
        factor: scenario.reduction,
        technologies,
    };
    apply_shortfall(network, &shortfall)
}

/// Solve a drought scenario starting from the solved base network.
///
/// Statistics for both networks are written to the results folder.
pub fn solve_drought(
    base: &Network,
    scenario: &DroughtScenario,
    settings: &Settings,
) -> Result<ScenarioOutcome> {
    let options = settings.solve_options().with_duals();
    let mut network = base.clone();
    inject_drought(&mut network, base, scenario, settings)?;
    propagate_capacities(&mut network, base, scenario.policy)?;

    info!("Optimising drought network ({})", scenario.policy);
    let mut problem = optimise(&mut network, &options)?;
    if scenario.policy == InvestmentPolicy::AllowInvestment {
        add_equity_constraint(&mut problem, &network, &scenario.equity)?;
        info!("Re-optimising drought network with equity constraint");
        problem.solve(&mut network, &options)?;
    }
    network.name = scenario.solved_name();
    write_statistics(&network, &settings.results_dir, &scenario.country, None)?;

    let mut rolling = network.clone();
    rolling.name = scenario.rolling_name();
    if scenario.policy == InvestmentPolicy::AllowInvestment {
        freeze_capacities(&mut rolling, &network)?;
    }
    prepare_rolling_horizon(&mut rolling, &network, Some(base))?;
    info!("Optimising drought network with rolling horizon");
    optimise_with_rolling_horizon(
        &mut rolling,
        scenario.horizon,
        settings.rolling_horizon_overlap,
        &options,
    )?;
    write_statistics(
        &rolling,
        &settings.results_dir,
        &scenario.country,
        Some(&network),
    )?;

    Ok(ScenarioOutcome {
        solved: network,
        rolling,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{network, solved_network};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn drought() -> DroughtScenario {
        DroughtScenario {
            contingency: "drought".into(),
            reduction: ReductionFactor::new(0.5).unwrap(),
            duration: 7,
            policy: InvestmentPolicy::NoInvestment,
            horizon: 7,
            country: "DE".into(),
            equity: "EQ0.5c".parse().unwrap(),
            tl: "1.0".into(),
            bus: "3".into(),
        }
    }

    fn settings_in(dir: &TempDir) -> Settings {
        Settings {
            results_dir: dir.path().join("results"),
            ..Settings::default()
        }
    }

    #[rstest]
    fn test_scenario_names(mut drought: DroughtScenario) {
        assert_eq!(drought.solved_name(), "drought_DE_3_1.0_0.5_7_noinv");
        assert_eq!(drought.rolling_name(), "drought_DE_3_1.0_0.5_7_noinvroll");
        drought.reduction = ReductionFactor::new(1.0).unwrap();
        drought.policy = InvestmentPolicy::AllowInvestment;
        assert_eq!(drought.rolling_name(), "drought_DE_3_1.0_1.0_7_invroll");

        let base = BaseScenario {
            co2_price: 0.0,
            horizon: 7,
            equity: drought.equity,
            country: "DE".into(),
            tl: "1.0".into(),
        };
        assert_eq!(base.solved_name(), "DE_1.0_base_solved");
        assert_eq!(base.rolling_name(), "DE_1.0_base_roll_solved");
    }

    #[rstest]
    fn test_set_load_shedding_cost(mut network: Network) {
        set_load_shedding_cost(&mut network, 12_345.0);
        let shedding = network
            .generators
            .values()
            .filter(|g| g.technology == Technology::LoadShedding)
            .collect_vec();
        assert!(!shedding.is_empty());
        assert!(
            shedding
                .iter()
                .all(|g| g.marginal_cost == MoneyPerEnergy(12_345.0))
        );
    }

    #[rstest]
    fn test_apply_co2_price(mut network: Network) {
        let before = network.clone();
        apply_co2_price(&mut network, 100.0).unwrap();
        for (id, generator) in &network.generators {
            let old = &before.generators[id];
            let emissions = network.carriers[&generator.carrier].co2_emissions;
            assert_approx_eq!(
                f64,
                generator.marginal_cost.value(),
                old.marginal_cost.value() + 100.0 * emissions / old.efficiency
            );
        }
    }

    #[rstest]
    fn test_solve_base(network: Network) {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(&dir);
        let scenario = BaseScenario {
            co2_price: 50.0,
            horizon: 7,
            equity: "EQ0.5c".parse().unwrap(),
            country: "DE".into(),
            tl: "1.0".into(),
        };

        let outcome = solve_base(network, &scenario, &settings).unwrap();
        assert_eq!(outcome.solved.name, "DE_1.0_base_solved");
        assert_eq!(outcome.rolling.name, "DE_1.0_base_roll_solved");
        assert!(
            outcome
                .rolling
                .generators
                .values()
                .all(|g| !g.capacity.extendable)
        );
        // Storage units are frozen and prepared for the rolling horizon
        for unit in outcome.rolling.storage_units.values() {
            assert!(!unit.capacity.extendable);
            assert!(!unit.cyclic_state_of_charge);
        }
        assert!(
            settings
                .results_dir
                .join("syscost_DE_1.0_base_roll_solved.csv")
                .is_file()
        );
    }

    #[rstest]
    #[case(InvestmentPolicy::NoInvestment)]
    #[case(InvestmentPolicy::AllowInvestment)]
    fn test_solve_drought(
        solved_network: Network,
        mut drought: DroughtScenario,
        #[case] policy: InvestmentPolicy,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(&dir);
        drought.policy = policy;

        let outcome = solve_drought(&solved_network, &drought, &settings).unwrap();
        assert_eq!(outcome.solved.name, drought.solved_name());
        assert_eq!(outcome.rolling.name, drought.rolling_name());
        assert!(
            outcome
                .rolling
                .storage_units
                .values()
                .all(|u| !u.cyclic_state_of_charge)
        );
        assert!(
            settings
                .results_dir
                .join(format!("cap_{}.csv", drought.solved_name()))
                .is_file()
        );
    }

    #[rstest]
    fn test_solve_drought_cuts_supply_in_window(solved_network: Network, drought: DroughtScenario) {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(&dir);
        let outcome = solve_drought(&solved_network, &drought, &settings).unwrap();

        let technologies = settings.shortfall_technologies();
        let start = select_shortfall_window(&solved_network, drought.duration, &technologies)
            .unwrap()
            .unwrap();
        let window = SnapshotWindow::from_start_and_days(start, drought.duration);
        let range = solved_network.snapshots.window_range(&window);
        assert!(range.len() >= 7);

        // Availability and inflow are halved within the window and untouched outside it
        let base_ror = &solved_network.generators[0];
        let ror = &outcome.solved.generators[0];
        assert_eq!(ror.technology, Technology::Ror);
        let base_availability = base_ror.p_max_pu_t.as_ref().unwrap();
        let availability = ror.p_max_pu_t.as_ref().unwrap();
        let base_inflow = solved_network.storage_units[0].inflow.as_ref().unwrap();
        let inflow = outcome.solved.storage_units[0].inflow.as_ref().unwrap();
        for k in 0..solved_network.snapshots.len() {
            let factor = if range.contains(&k) { 0.5 } else { 1.0 };
            assert_approx_eq!(f64, availability[k], factor * base_availability[k]);
            assert_approx_eq!(f64, inflow[k], factor * base_inflow[k]);
        }

        // Run-of-river output within the window falls by at least the lost availability
        let capacity = base_ror.capacity.nominal.value();
        let available: f64 = range.clone().map(|k| availability[k] * capacity).sum();
        let produced: f64 = range.clone().map(|k| ror.dispatch.as_ref().unwrap()[k]).sum();
        let base_produced: f64 = range
            .clone()
            .map(|k| base_ror.dispatch.as_ref().unwrap()[k])
            .sum();
        assert!(produced <= available + 1e-6);
        assert!(base_produced - produced >= (base_produced - available).max(0.0) - 1e-6);

        // Nuclear can produce at most half of its base output within the window
        let base_nuclear = &solved_network.generators[1];
        let nuclear = &outcome.solved.generators[1];
        assert_eq!(nuclear.technology, Technology::Nuclear);
        let base_dispatch = base_nuclear.dispatch.as_ref().unwrap();
        let dispatch = nuclear.dispatch.as_ref().unwrap();
        for k in range {
            assert!(dispatch[k] <= 0.5 * base_dispatch[k] + 1e-6);
        }
    }
}
