//! Propagation of optimal capacities from a solved network to a derived one.
use crate::id::IDLike;
use crate::network::{HasCapacity, LV_LIMIT, Network, reference_optimum};
use crate::technology::Technology;
use crate::units::Dimensionless;
use anyhow::Result;
use clap::ValueEnum;
use indexmap::IndexMap;
use log::{debug, info};
use std::fmt;

/// Multiple of the reference capacity up to which transmission may be expanded
const TRANSMISSION_EXPANSION_FACTOR: Dimensionless = Dimensionless(1.5);

/// Whether investment in new capacity is allowed in a derived network
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InvestmentPolicy {
    /// Capacities are fixed at the reference optimum
    #[value(name = "noinv")]
    NoInvestment,
    /// Capacities may grow beyond the reference optimum
    #[value(name = "inv")]
    AllowInvestment,
}

impl fmt::Display for InvestmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInvestment => write!(f, "noinv"),
            Self::AllowInvestment => write!(f, "inv"),
        }
    }
}

/// Fix every extendable asset in `assets` at the optimum of the same asset in `reference`
fn freeze_assets<ID, T>(assets: &mut IndexMap<ID, T>, reference: &IndexMap<ID, T>) -> Result<()>
where
    ID: IDLike,
    T: HasCapacity,
{
    for (id, asset) in assets.iter_mut() {
        if asset.capacity().extendable {
            let optimum = reference_optimum(reference, id)?;
            asset.capacity_mut().freeze_at(optimum);
        }
    }

    Ok(())
}

/// Fix the capacity of every extendable asset at the optimum found for `reference`.
///
/// Assets which are not extendable are left untouched.
pub fn freeze_capacities(network: &mut Network, reference: &Network) -> Result<()> {
    freeze_assets(&mut network.generators, &reference.generators)?;
    freeze_assets(&mut network.storage_units, &reference.storage_units)?;
    freeze_assets(&mut network.stores, &reference.stores)?;
    freeze_assets(&mut network.lines, &reference.lines)?;
    freeze_assets(&mut network.links, &reference.links)?;
    debug!("Froze capacities of {} at reference optimum", network.name);

    Ok(())
}

/// Allow generators and storage units to be built beyond the reference optimum.
///
/// Extendable assets keep their upper bound (raised to the optimum if needed); the others are
/// fixed at the optimum.
fn unlock_assets<ID, T>(assets: &mut IndexMap<ID, T>, reference: &IndexMap<ID, T>) -> Result<()>
where
    ID: IDLike,
    T: HasCapacity,
{
    for (id, asset) in assets.iter_mut() {
        let optimum = reference_optimum(reference, id)?;
        let capacity = asset.capacity_mut();
        if capacity.extendable {
            capacity.min = optimum;
            if capacity.max < optimum {
                capacity.max = optimum;
            }
        } else {
            capacity.freeze_at(optimum);
        }
    }

    Ok(())
}

/// Allow transmission assets of the given technology to expand up to a multiple of the optimum.
///
/// Assets of any other technology are fixed at the optimum.
fn unlock_transmission<ID, T, F>(
    assets: &mut IndexMap<ID, T>,
    reference: &IndexMap<ID, T>,
    technology: &Technology,
    technology_of: F,
) -> Result<()>
where
    ID: IDLike,
    T: HasCapacity,
    F: Fn(&T) -> &Technology,
{
    for (id, asset) in assets.iter_mut() {
        let optimum = reference_optimum(reference, id)?;
        let eligible = technology_of(asset) == technology;
        let capacity = asset.capacity_mut();
        if eligible {
            capacity.extendable = true;
            capacity.min = optimum;
            capacity.max = optimum * TRANSMISSION_EXPANSION_FACTOR;
            capacity.nominal = optimum;
        } else {
            capacity.freeze_at(optimum);
        }
    }

    Ok(())
}

/// Allow investment beyond the optimum found for `reference`.
///
/// The transmission expansion limit is removed. Generators and storage units may grow from their
/// optimum if they were extendable. AC lines and DC links may grow up to 1.5 times their optimum.
/// Stores are left as they are.
pub fn unlock_capacities(network: &mut Network, reference: &Network) -> Result<()> {
    if network.global_constraints.shift_remove(LV_LIMIT).is_some() {
        info!("Removed global constraint {LV_LIMIT}");
    }

    unlock_assets(&mut network.generators, &reference.generators)?;
    unlock_assets(&mut network.storage_units, &reference.storage_units)?;
    unlock_transmission(
        &mut network.lines,
        &reference.lines,
        &Technology::Ac,
        |line| &line.technology,
    )?;
    unlock_transmission(
        &mut network.links,
        &reference.links,
        &Technology::Dc,
        |link| &link.technology,
    )?;
    debug!("Unlocked capacities of {} from reference optimum", network.name);

    Ok(())
}

/// Carry capacities from `reference` over to `network` according to the policy
pub fn propagate_capacities(
    network: &mut Network,
    reference: &Network,
    policy: InvestmentPolicy,
) -> Result<()> {
    match policy {
        InvestmentPolicy::NoInvestment => freeze_capacities(network, reference),
        InvestmentPolicy::AllowInvestment => unlock_capacities(network, reference),
    }
}
