//! The module responsible for writing output data to disk.
use crate::input::component::{
    BUSES_FILE_NAME, BusRow, CARRIERS_FILE_NAME, CarrierRow, GENERATORS_FILE_NAME,
    GLOBAL_CONSTRAINTS_FILE_NAME, GeneratorRow, GlobalConstraintRow, LINES_FILE_NAME,
    LINKS_FILE_NAME, LOADS_FILE_NAME, LineRow, LinkRow, LoadRow, NETWORK_FILE_NAME, NetworkRow,
    STORAGE_UNITS_FILE_NAME, STORES_FILE_NAME, SNAPSHOTS_FILE_NAME, StorageUnitRow, StoreRow,
};
use crate::input::series::SeriesAttribute;
use crate::network::Network;
use crate::series::TimeSeries;
use crate::snapshot::{SNAPSHOT_FORMAT, Snapshots};
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub mod metadata;
use metadata::write_metadata;
pub mod statistics;

/// Create a new output directory, returning whether an existing directory was overwritten.
///
/// If the directory already exists and is not empty, `overwrite` must be set, in which case its
/// contents are deleted.
///
/// # Arguments
///
/// * `output_dir` - The folder to create
/// * `overwrite` - Whether an existing non-empty folder may be replaced
///
/// # Returns
///
/// True if an existing folder was overwritten, false otherwise, or an error.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    let overwritten = if output_dir.is_dir() {
        if output_dir.read_dir()?.next().is_none() {
            // Empty folder, nothing to do
            return Ok(false);
        }

        ensure!(
            overwrite,
            "Output folder {} already exists and is not empty. Set `overwrite` to replace it.",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwritten)
}

/// Write rows to a CSV file
fn write_rows<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write rows to a CSV file, unless there are none
fn write_rows_if_any<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return Ok(());
    }

    write_rows(file_path, rows)
}

/// Write a wide table of time series, one column per component.
///
/// Nothing is written if there are no series.
fn write_series_file<'a, I>(file_path: &Path, snapshots: &Snapshots, series: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a TimeSeries)>,
{
    let (names, columns): (Vec<_>, Vec<_>) = series.into_iter().unzip();
    if names.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(file_path)?;
    writer.write_field("snapshot")?;
    writer.write_record(&names)?;
    for (k, timestamp) in snapshots.timestamps().iter().enumerate() {
        writer.write_field(timestamp.format(SNAPSHOT_FORMAT).to_string())?;
        writer.write_record(columns.iter().map(|column| column[k].to_string()))?;
    }
    writer.flush()?;

    Ok(())
}

/// Collect the named series of one attribute across a component map
macro_rules! named_series {
    ($map:expr, $field:ident) => {
        $map.iter()
            .filter_map(|(id, c)| c.$field.as_ref().map(|s| (id.as_str(), s)))
            .collect::<Vec<_>>()
    };
}

/// Gather the series of the given attribute
fn attribute_series(network: &Network, attribute: SeriesAttribute) -> Vec<(&str, &TimeSeries)> {
    match attribute {
        SeriesAttribute::GeneratorAvailability => named_series!(network.generators, p_max_pu_t),
        SeriesAttribute::GeneratorDispatch => named_series!(network.generators, dispatch),
        SeriesAttribute::StorageInflow => named_series!(network.storage_units, inflow),
        SeriesAttribute::StorageDispatch => named_series!(network.storage_units, p_dispatch),
        SeriesAttribute::StorageCharge => named_series!(network.storage_units, p_store),
        SeriesAttribute::StorageStateOfCharge => {
            named_series!(network.storage_units, state_of_charge)
        }
        SeriesAttribute::StorageSpill => named_series!(network.storage_units, spill),
        SeriesAttribute::StorageEnergyBalanceDual => {
            named_series!(network.storage_units, mu_energy_balance)
        }
        SeriesAttribute::StoreEnergy => named_series!(network.stores, energy),
        SeriesAttribute::StorePower => named_series!(network.stores, power),
        SeriesAttribute::LineFlow => named_series!(network.lines, flow),
        SeriesAttribute::LinkFlow => named_series!(network.links, flow),
        SeriesAttribute::LoadDemand => network
            .loads
            .iter()
            .map(|(id, load)| (id.as_str(), &load.p_set))
            .collect(),
        SeriesAttribute::BusMarginalPrice => named_series!(network.buses, marginal_price),
    }
}

/// Export a network, including any results, to a folder of CSV files.
///
/// The folder is created if needed. Files from a previous export are replaced.
///
/// # Arguments
///
/// * `network` - The network to export
/// * `output_dir` - Folder the CSV files are written to
/// * `input_path` - Where the network was read from, recorded in the metadata
pub fn export_network(network: &Network, output_dir: &Path, input_path: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create folder {}", output_dir.display()))?;
    write_network_files(network, output_dir)
        .with_context(|| format!("Failed to export network to {}", output_dir.display()))?;
    write_metadata(output_dir, network, input_path)?;

    Ok(())
}

fn write_network_files(network: &Network, dir: &Path) -> Result<()> {
    write_rows(
        &dir.join(NETWORK_FILE_NAME),
        [NetworkRow {
            name: network.name.clone(),
            objective: network.objective.map(|objective| objective.value()),
        }],
    )?;
    write_rows(&dir.join(SNAPSHOTS_FILE_NAME), network.snapshots.to_rows())?;
    write_rows_if_any(
        &dir.join(CARRIERS_FILE_NAME),
        network.carriers.values().map(|carrier| CarrierRow {
            name: carrier.id.clone(),
            co2_emissions: carrier.co2_emissions,
        }),
    )?;
    write_rows(
        &dir.join(BUSES_FILE_NAME),
        network.buses.values().map(|bus| BusRow {
            name: bus.id.clone(),
            carrier: bus.carrier.to_string(),
            country: bus.country.as_ref().map(ToString::to_string),
            x: bus.x,
            y: bus.y,
        }),
    )?;
    write_rows_if_any(
        &dir.join(GENERATORS_FILE_NAME),
        network.generators.values().map(GeneratorRow::from),
    )?;
    write_rows_if_any(
        &dir.join(STORAGE_UNITS_FILE_NAME),
        network.storage_units.values().map(StorageUnitRow::from),
    )?;
    write_rows_if_any(
        &dir.join(STORES_FILE_NAME),
        network.stores.values().map(StoreRow::from),
    )?;
    write_rows_if_any(
        &dir.join(LINES_FILE_NAME),
        network.lines.values().map(LineRow::from),
    )?;
    write_rows_if_any(
        &dir.join(LINKS_FILE_NAME),
        network.links.values().map(LinkRow::from),
    )?;
    // Demand is always written as a time series
    write_rows_if_any(
        &dir.join(LOADS_FILE_NAME),
        network.loads.values().map(|load| LoadRow {
            name: load.id.clone(),
            bus: load.bus.clone(),
            p_set: 0.0,
        }),
    )?;
    write_rows_if_any(
        &dir.join(GLOBAL_CONSTRAINTS_FILE_NAME),
        network.global_constraints.values().map(GlobalConstraintRow::from),
    )?;

    for attribute in SeriesAttribute::ALL {
        let file_path = dir.join(attribute.file_name());
        if file_path.is_file() {
            // Remove stale results from a previous export
            fs::remove_file(&file_path)?;
        }
        write_series_file(
            &file_path,
            &network.snapshots,
            attribute_series(network, attribute),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{network, solved_network};
    use crate::input::load_network;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        let result = create_output_directory(&output_dir, false).unwrap();
        assert!(!result);
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&output_dir).unwrap();
        assert!(!create_output_directory(&output_dir, false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing_with_files() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&output_dir).unwrap();
        File::create(output_dir.join("existing_file.txt")).unwrap();

        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(output_dir.is_dir());
        assert!(!output_dir.join("existing_file.txt").exists());
    }

    #[rstest]
    fn test_export_and_load_network(network: Network) {
        let dir = tempdir().unwrap();
        export_network(&network, dir.path(), Path::new("input")).unwrap();
        assert!(dir.path().join("metadata.toml").is_file());

        let loaded = load_network(dir.path()).unwrap();
        assert_eq!(loaded, network);
    }

    #[rstest]
    fn test_export_and_load_solved_network(solved_network: Network) {
        let dir = tempdir().unwrap();
        export_network(&solved_network, dir.path(), Path::new("input")).unwrap();

        let loaded = load_network(dir.path()).unwrap();
        assert_eq!(loaded.generators, solved_network.generators);
        assert_eq!(loaded.storage_units, solved_network.storage_units);
        assert_eq!(loaded.objective, solved_network.objective);
    }

    #[rstest]
    fn test_export_removes_stale_results(solved_network: Network, network: Network) {
        let dir = tempdir().unwrap();
        export_network(&solved_network, dir.path(), Path::new("input")).unwrap();
        export_network(&network, dir.path(), Path::new("input")).unwrap();
        assert!(
            !dir.path()
                .join(SeriesAttribute::GeneratorDispatch.file_name())
                .exists()
        );
    }
}
