//! Writing summary statistics of a solved network to CSV files.
use super::write_rows;
use crate::network::Network;
use crate::snapshot::SNAPSHOT_FORMAT;
use crate::statistics::{capex, optimal_capacity, supply, system_cost};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// MW per GW
const MW_PER_GW: f64 = 1e3;

/// Currency units per billion
const PER_BILLION: f64 = 1e9;

/// Optimal capacity of a group of assets
#[derive(Serialize)]
struct CapacityRow<'a> {
    component: String,
    carrier: &'a str,
    country: &'a str,
    capacity_gw: f64,
}

/// Supply of a carrier in a country at one snapshot
#[derive(Serialize)]
struct SupplyRow<'a> {
    snapshot: String,
    carrier: &'a str,
    country: &'a str,
    supply_gw: f64,
}

/// Capital expenditure of a group of assets
#[derive(Serialize)]
struct CapexRow<'a> {
    component: String,
    carrier: &'a str,
    country: &'a str,
    capex_bn: f64,
}

/// Total system cost of a carrier in a country
#[derive(Serialize)]
struct SystemCostRow<'a> {
    carrier: &'a str,
    country: &'a str,
    cost_bn: f64,
}

/// The path of a statistics file for the named network
fn statistics_file_path(results_dir: &Path, prefix: &str, name: &str) -> PathBuf {
    results_dir.join(format!("{prefix}_{name}.csv"))
}

/// Write the statistics of a solved network into `results_dir`.
///
/// Four files are written, named after the network: `cap_<name>.csv` (optimal capacity, GW),
/// `gen_<name>.csv` (supply, GW), `capex_<name>.csv` (bn) and `syscost_<name>.csv` (bn). Lines and
/// links touching `focus` are attributed to it. If `cost_reference` is given, storage operating
/// costs are computed with its marginal costs.
pub fn write_statistics(
    network: &Network,
    results_dir: &Path,
    focus: &str,
    cost_reference: Option<&Network>,
) -> Result<()> {
    fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create folder {}", results_dir.display()))?;
    let name = &network.name;

    let capacity = optimal_capacity(network, focus)?;
    write_rows(
        &statistics_file_path(results_dir, "cap", name),
        capacity
            .iter()
            .map(|((kind, carrier, country), capacity)| CapacityRow {
                component: kind.to_string(),
                carrier: carrier.as_str(),
                country: country.as_str(),
                capacity_gw: capacity.value() / MW_PER_GW,
            }),
    )?;

    let supply = supply(network)?;
    let timestamps = network.snapshots.timestamps();
    write_rows(
        &statistics_file_path(results_dir, "gen", name),
        supply.iter().flat_map(|((carrier, country), series)| {
            timestamps
                .iter()
                .zip(series.iter())
                .map(move |(timestamp, value)| SupplyRow {
                    snapshot: timestamp.format(SNAPSHOT_FORMAT).to_string(),
                    carrier: carrier.as_str(),
                    country: country.as_str(),
                    supply_gw: value / MW_PER_GW,
                })
        }),
    )?;

    let capex = capex(network, focus)?;
    write_rows(
        &statistics_file_path(results_dir, "capex", name),
        capex
            .iter()
            .map(|((kind, carrier, country), cost)| CapexRow {
                component: kind.to_string(),
                carrier: carrier.as_str(),
                country: country.as_str(),
                capex_bn: cost.value() / PER_BILLION,
            }),
    )?;

    let costs = system_cost(network, focus, cost_reference)?;
    write_rows(
        &statistics_file_path(results_dir, "syscost", name),
        costs.iter().map(|((carrier, country), cost)| SystemCostRow {
            carrier: carrier.as_str(),
            country: country.as_str(),
            cost_bn: cost.value() / PER_BILLION,
        }),
    )?;

    info!(
        "Statistics for {name} written to {}",
        results_dir.display()
    );

    Ok(())
}
