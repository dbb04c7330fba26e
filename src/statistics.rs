//! Summary statistics of solved networks: capacities, supply and system cost.
//!
//! Quantities are aggregated by component kind, carrier and country. The country of a generator,
//! storage unit or store is given by the first two characters of its bus name. A line or link is
//! attributed to the focus country of the run if either end lies in it and otherwise to the
//! country of its first bus.
use crate::id::{BusID, CarrierID, CountryID};
use crate::network::{CapacityLimits, Network};
use crate::series::TimeSeries;
use crate::snapshot::Snapshots;
use crate::units::{Capacity, Money, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use std::fmt::Display;

/// The kind of component a statistic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ComponentKind {
    /// Generators
    Generator,
    /// Storage units
    StorageUnit,
    /// Stores
    Store,
    /// Lines
    Line,
    /// Links
    Link,
}

/// A group of assets over which statistics are aggregated
pub type StatisticKey = (ComponentKind, CarrierID, CountryID);

/// The country a bus lies in, according to the first two characters of its name
pub fn country_of_bus(bus: &BusID) -> Result<CountryID> {
    let name = bus.as_str();
    let country: String = name.chars().take(2).collect();
    ensure!(
        country.chars().count() == 2,
        "Cannot determine country of bus {name}"
    );

    Ok(CountryID::from(country))
}

/// The country a line or link is attributed to
pub fn branch_country(bus0: &BusID, bus1: &BusID, focus: &str) -> Result<CountryID> {
    if bus0.as_str().contains(focus) || bus1.as_str().contains(focus) {
        return Ok(CountryID::new(focus));
    }

    country_of_bus(bus0)
}

/// The figures of a single asset which enter the statistics
struct AssetFigures {
    key: StatisticKey,
    capacity: Capacity,
    capex: Money,
    opex: Money,
}

/// The optimal capacity of an asset, which must have been solved
fn optimal_capacity_of(id: &dyn Display, capacity: &CapacityLimits) -> Result<Capacity> {
    capacity
        .optimal
        .with_context(|| format!("No optimal capacity found for {id}"))
}

/// A result series of an asset, which must have been solved
fn result_of<'a>(
    id: &dyn Display,
    attribute: &str,
    series: Option<&'a TimeSeries>,
) -> Result<&'a TimeSeries> {
    series.with_context(|| format!("No {attribute} found for {id}"))
}

/// Weighted operating cost of an asset with the given marginal cost and output
fn operating_cost<F>(
    snapshots: &Snapshots,
    cost: MoneyPerEnergy,
    output: &TimeSeries,
    f: F,
) -> Money
where
    F: Fn(f64) -> f64,
{
    let total: f64 = snapshots
        .weightings()
        .iter()
        .zip(output.iter())
        .map(|(w, value)| w.objective * f(value))
        .sum();

    Money(cost.value() * total)
}

/// Collect the figures of every asset in the network.
///
/// If `cost_reference` is given, storage unit marginal costs are taken from it, so that
/// operating costs can be compared with those of the reference network.
fn asset_figures(
    network: &Network,
    focus: &str,
    cost_reference: Option<&Network>,
) -> Result<Vec<AssetFigures>> {
    let snapshots = &network.snapshots;
    let mut figures = Vec::new();

    for (id, generator) in &network.generators {
        let capacity = optimal_capacity_of(id, &generator.capacity)?;
        let dispatch = result_of(id, "dispatch", generator.dispatch.as_ref())?;
        figures.push(AssetFigures {
            key: (
                ComponentKind::Generator,
                generator.carrier.clone(),
                country_of_bus(&generator.bus)?,
            ),
            capacity,
            capex: generator.capital_cost * capacity,
            opex: operating_cost(snapshots, generator.marginal_cost, dispatch, |p| p),
        });
    }

    for (id, unit) in &network.storage_units {
        let capacity = optimal_capacity_of(id, &unit.capacity)?;
        let dispatch = result_of(id, "dispatch", unit.p_dispatch.as_ref())?;
        let marginal_cost = match cost_reference {
            Some(reference) => {
                reference
                    .storage_units
                    .get(id)
                    .with_context(|| {
                        format!("Storage unit {id} not found in cost reference network")
                    })?
                    .marginal_cost
            }
            None => unit.marginal_cost,
        };
        figures.push(AssetFigures {
            key: (
                ComponentKind::StorageUnit,
                unit.carrier.clone(),
                country_of_bus(&unit.bus)?,
            ),
            capacity,
            capex: unit.capital_cost * capacity,
            opex: operating_cost(snapshots, marginal_cost, dispatch, |p| p),
        });
    }

    for (id, store) in &network.stores {
        let capacity = optimal_capacity_of(id, &store.capacity)?;
        let power = result_of(id, "power", store.power.as_ref())?;
        figures.push(AssetFigures {
            key: (
                ComponentKind::Store,
                store.carrier.clone(),
                country_of_bus(&store.bus)?,
            ),
            capacity,
            capex: store.capital_cost * capacity,
            opex: operating_cost(snapshots, store.marginal_cost, power, |p| p.max(0.0)),
        });
    }

    for (id, line) in &network.lines {
        let capacity = optimal_capacity_of(id, &line.capacity)?;
        figures.push(AssetFigures {
            key: (
                ComponentKind::Line,
                line.carrier.clone(),
                branch_country(&line.bus0, &line.bus1, focus)?,
            ),
            capacity,
            capex: line.capital_cost * capacity,
            opex: Money(0.0),
        });
    }

    for (id, link) in &network.links {
        let capacity = optimal_capacity_of(id, &link.capacity)?;
        let flow = result_of(id, "flow", link.flow.as_ref())?;
        figures.push(AssetFigures {
            key: (
                ComponentKind::Link,
                link.carrier.clone(),
                branch_country(&link.bus0, &link.bus1, focus)?,
            ),
            capacity,
            capex: link.capital_cost * capacity,
            opex: operating_cost(snapshots, link.marginal_cost, flow, |p| p),
        });
    }

    Ok(figures)
}

/// Sum a figure over assets with the same key
fn aggregate<F, T>(figures: &[AssetFigures], value: F) -> IndexMap<StatisticKey, T>
where
    F: Fn(&AssetFigures) -> T,
    T: std::ops::AddAssign + Default,
{
    let mut totals: IndexMap<StatisticKey, T> = IndexMap::new();
    for asset in figures {
        *totals.entry(asset.key.clone()).or_default() += value(asset);
    }

    totals
}

/// Optimal capacity (MW, or MWh for stores) by component kind, carrier and country
pub fn optimal_capacity(
    network: &Network,
    focus: &str,
) -> Result<IndexMap<StatisticKey, Capacity>> {
    let figures = asset_figures(network, focus, None)?;
    Ok(aggregate(&figures, |asset| asset.capacity))
}

/// Capital expenditure by component kind, carrier and country
pub fn capex(network: &Network, focus: &str) -> Result<IndexMap<StatisticKey, Money>> {
    let figures = asset_figures(network, focus, None)?;
    Ok(aggregate(&figures, |asset| asset.capex))
}

/// Operating expenditure by component kind, carrier and country
pub fn opex(
    network: &Network,
    focus: &str,
    cost_reference: Option<&Network>,
) -> Result<IndexMap<StatisticKey, Money>> {
    let figures = asset_figures(network, focus, cost_reference)?;
    Ok(aggregate(&figures, |asset| asset.opex))
}

/// Total system cost (capital plus operating) by carrier and country.
///
/// Only carriers declared in the network and countries hosting at least one generator are
/// reported. Every such pair is present, with zero cost if no asset matches.
pub fn system_cost(
    network: &Network,
    focus: &str,
    cost_reference: Option<&Network>,
) -> Result<IndexMap<(CarrierID, CountryID), Money>> {
    let countries: IndexSet<CountryID> = network
        .generators
        .values()
        .map(|generator| country_of_bus(&generator.bus))
        .collect::<Result<_>>()?;

    let mut costs: IndexMap<(CarrierID, CountryID), Money> = network
        .carriers
        .keys()
        .flat_map(|carrier| {
            countries
                .iter()
                .map(move |country| ((carrier.clone(), country.clone()), Money(0.0)))
        })
        .collect();

    for asset in asset_figures(network, focus, cost_reference)? {
        let (_, carrier, country) = asset.key;
        if let Some(cost) = costs.get_mut(&(carrier, country)) {
            *cost += asset.capex + asset.opex;
        }
    }

    Ok(costs)
}

/// Time-resolved supply (MW) by carrier and country.
///
/// Supply is the positive part of generator dispatch and of storage unit net dispatch.
pub fn supply(network: &Network) -> Result<IndexMap<(CarrierID, CountryID), TimeSeries>> {
    let len = network.snapshots.len();
    let mut totals: IndexMap<(CarrierID, CountryID), Vec<f64>> = IndexMap::new();
    let mut add = |key: (CarrierID, CountryID), output: &TimeSeries| {
        let total = totals.entry(key).or_insert_with(|| vec![0.0; len]);
        for (sum, value) in total.iter_mut().zip(output.iter()) {
            *sum += value.max(0.0);
        }
    };

    for (id, generator) in &network.generators {
        let dispatch = result_of(id, "dispatch", generator.dispatch.as_ref())?;
        add(
            (generator.carrier.clone(), country_of_bus(&generator.bus)?),
            dispatch,
        );
    }
    for (id, unit) in &network.storage_units {
        let dispatch = unit
            .net_dispatch()
            .with_context(|| format!("No dispatch found for {id}"))?;
        add((unit.carrier.clone(), country_of_bus(&unit.bus)?), &dispatch);
    }

    Ok(totals
        .into_iter()
        .map(|(key, values)| (key, TimeSeries::new(values)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, solved_network};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case("DE0 0", "DE")]
    #[case("FR", "FR")]
    #[case("ES1 3 H2", "ES")]
    fn test_country_of_bus(#[case] bus: &str, #[case] expected: &str) {
        assert_eq!(country_of_bus(&bus.into()).unwrap().as_str(), expected);
    }

    #[test]
    fn test_country_of_bus_too_short() {
        assert_error!(
            country_of_bus(&"D".into()),
            "Cannot determine country of bus D"
        );
    }

    #[rstest]
    #[case("DE0 0", "FR0 0", "FR", "FR")]
    #[case("DE0 0", "FR0 0", "DE", "DE")]
    #[case("DE0 0", "FR0 0", "ES", "DE")]
    fn test_branch_country(
        #[case] bus0: &str,
        #[case] bus1: &str,
        #[case] focus: &str,
        #[case] expected: &str,
    ) {
        let country = branch_country(&bus0.into(), &bus1.into(), focus).unwrap();
        assert_eq!(country.as_str(), expected);
    }

    #[rstest]
    fn test_optimal_capacity_totals(solved_network: Network) {
        let capacity = optimal_capacity(&solved_network, "DE").unwrap();
        let total: f64 = capacity
            .iter()
            .filter(|((kind, _, _), _)| *kind == ComponentKind::Generator)
            .map(|(_, capacity)| capacity.value())
            .sum();
        let expected: f64 = solved_network
            .generators
            .values()
            .map(|g| g.capacity.optimal.unwrap().value())
            .sum();
        assert_approx_eq!(f64, total, expected);
    }

    #[rstest]
    fn test_opex_uses_cost_reference(solved_network: Network) {
        let mut reference = solved_network.clone();
        for unit in reference.storage_units.values_mut() {
            unit.marginal_cost = MoneyPerEnergy(0.0);
        }
        let mut expensive = solved_network.clone();
        for unit in expensive.storage_units.values_mut() {
            unit.marginal_cost = MoneyPerEnergy(1000.0);
        }

        let costs = opex(&expensive, "DE", Some(&reference)).unwrap();
        let storage_opex: f64 = costs
            .iter()
            .filter(|((kind, _, _), _)| *kind == ComponentKind::StorageUnit)
            .map(|(_, cost)| cost.value())
            .sum();
        assert_approx_eq!(f64, storage_opex, 0.0);
    }

    #[rstest]
    fn test_system_cost_covers_carriers_and_countries(solved_network: Network) {
        let costs = system_cost(&solved_network, "DE", None).unwrap();
        let countries: IndexSet<_> = costs.keys().map(|(_, country)| country.clone()).collect();
        assert!(countries.contains("DE"));
        assert_eq!(
            costs.len(),
            solved_network.carriers.len() * countries.len()
        );
        assert!(costs.values().all(|cost| cost.value() >= 0.0));
    }

    #[rstest]
    fn test_supply_is_non_negative(solved_network: Network) {
        let supply = supply(&solved_network).unwrap();
        assert!(!supply.is_empty());
        for series in supply.values() {
            assert_eq!(series.len(), solved_network.snapshots.len());
            assert!(series.iter().all(|value| value >= 0.0));
        }
    }

    #[rstest]
    fn test_statistics_require_results(mut solved_network: Network) {
        solved_network.generators[0].capacity.optimal = None;
        let id = solved_network.generators[0].id.clone();
        assert_error!(
            capex(&solved_network, "DE"),
            format!("No optimal capacity found for {id}")
        );
    }
}
