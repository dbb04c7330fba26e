//! Drought scenario analysis for power-system capacity expansion models.
//!
//! A solved network is perturbed with a resource shortfall, re-optimised with and without further
//! investment and then operated with limited foresight (rolling horizon) so that the cost of
//! imperfect operation can be compared with the perfect-foresight optimum.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod id;
pub mod input;
pub mod log;
pub mod network;
pub mod optimisation;
pub mod output;
pub mod scenario;
pub mod series;
pub mod settings;
pub mod snapshot;
pub mod statistics;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program-wide configuration files are stored
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No home directory (e.g. on some CI runners); fall back to the working directory
        return PathBuf::from(".");
    };
    config_dir.push("drought_rh");
    config_dir
}
