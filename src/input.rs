//! Common routines for handling input data.
//!
//! Networks are read from a folder of CSV files in the layout used by PyPSA's CSV import/export:
//! one static table per component type plus wide tables (`<component>-<attribute>.csv`) for
//! time-varying attributes.
use crate::id::{HasID, IDLike};
use crate::network::Network;
use crate::network::topology::count_sub_networks;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod component;
use component::read_components;
pub mod series;
use series::read_time_series;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// The file may be missing or empty, in which case no records are returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<T: DeserializeOwned>(
    file_path: &Path,
) -> Result<impl Iterator<Item = T>> {
    if !file_path.is_file() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a boolean, accepting the capitalised forms written by Python tools as well as `0`/`1`
pub fn deserialise_bool<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserialiser)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "Invalid boolean value: {other}"
        ))),
    }
}

/// Collect components into a map indexed by ID, checking for duplicates
pub fn collect_by_id<ID, T, I>(iter: I) -> Result<IndexMap<ID, T>>
where
    ID: IDLike,
    T: HasID<ID>,
    I: IntoIterator<Item = T>,
{
    let mut map = IndexMap::new();
    for item in iter {
        let id = item.get_id().clone();
        ensure!(!map.contains_key(&id), "Duplicate ID {id} found");
        map.insert(id, item);
    }

    Ok(map)
}

/// Load a network from the specified folder.
///
/// # Arguments
///
/// * `network_dir` - Folder containing the network's CSV files
///
/// # Returns
///
/// The validated network or an error.
pub fn load_network(network_dir: &Path) -> Result<Network> {
    ensure!(
        network_dir.is_dir(),
        "Network folder {} does not exist",
        network_dir.display()
    );

    let mut network = read_components(network_dir)?;
    read_time_series(network_dir, &mut network)?;
    network
        .validate()
        .with_context(|| format!("Invalid network in {}", network_dir.display()))?;

    info!(
        "Loaded network '{}' with {} buses, {} generators and {} storage units over {} snapshots",
        network.name,
        network.buses.len(),
        network.generators.len(),
        network.storage_units.len(),
        network.snapshots.len()
    );
    debug!(
        "Network consists of {} sub-network(s)",
        count_sub_networks(&network)
    );

    Ok(network)
}
