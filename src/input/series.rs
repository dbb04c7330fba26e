//! Time-varying attributes, stored in wide tables with one column per component.
use super::input_err_msg;
use crate::id::IDLike;
use crate::network::Network;
use crate::series::TimeSeries;
use crate::snapshot::{Snapshots, parse_snapshot};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::path::Path;

/// A time-varying attribute of a component type and the file in which it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeriesAttribute {
    GeneratorAvailability,
    GeneratorDispatch,
    StorageInflow,
    StorageDispatch,
    StorageCharge,
    StorageStateOfCharge,
    StorageSpill,
    StorageEnergyBalanceDual,
    StoreEnergy,
    StorePower,
    LineFlow,
    LinkFlow,
    LoadDemand,
    BusMarginalPrice,
}

impl SeriesAttribute {
    /// Every attribute, in the order in which files are read and written
    pub(crate) const ALL: [SeriesAttribute; 14] = [
        Self::GeneratorAvailability,
        Self::GeneratorDispatch,
        Self::StorageInflow,
        Self::StorageDispatch,
        Self::StorageCharge,
        Self::StorageStateOfCharge,
        Self::StorageSpill,
        Self::StorageEnergyBalanceDual,
        Self::StoreEnergy,
        Self::StorePower,
        Self::LineFlow,
        Self::LinkFlow,
        Self::LoadDemand,
        Self::BusMarginalPrice,
    ];

    /// The name of the file holding this attribute
    pub(crate) fn file_name(self) -> &'static str {
        match self {
            Self::GeneratorAvailability => "generators-p_max_pu.csv",
            Self::GeneratorDispatch => "generators-p.csv",
            Self::StorageInflow => "storage_units-inflow.csv",
            Self::StorageDispatch => "storage_units-p_dispatch.csv",
            Self::StorageCharge => "storage_units-p_store.csv",
            Self::StorageStateOfCharge => "storage_units-state_of_charge.csv",
            Self::StorageSpill => "storage_units-spill.csv",
            Self::StorageEnergyBalanceDual => "storage_units-mu_energy_balance.csv",
            Self::StoreEnergy => "stores-e.csv",
            Self::StorePower => "stores-p.csv",
            Self::LineFlow => "lines-p0.csv",
            Self::LinkFlow => "links-p0.csv",
            Self::LoadDemand => "loads-p_set.csv",
            Self::BusMarginalPrice => "buses-marginal_price.csv",
        }
    }
}

/// Read a wide table of time series.
///
/// The first column holds snapshot timestamps, which must match the network's snapshots exactly.
/// Each further column holds the series for the component named in the header. A missing file
/// yields no series.
fn read_series_file(
    file_path: &Path,
    snapshots: &Snapshots,
) -> Result<IndexMap<String, TimeSeries>> {
    if !file_path.is_file() {
        return Ok(IndexMap::new());
    }

    read_series_file_internal(file_path, snapshots).with_context(|| input_err_msg(file_path))
}

fn read_series_file_internal(
    file_path: &Path,
    snapshots: &Snapshots,
) -> Result<IndexMap<String, TimeSeries>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers = reader.headers()?.clone();
    ensure!(
        headers.get(0) == Some("snapshot"),
        "First column must be \"snapshot\""
    );

    let names: Vec<&str> = headers.iter().skip(1).collect();
    let mut columns = vec![Vec::with_capacity(snapshots.len()); names.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let timestamp = parse_snapshot(&record[0])?;
        ensure!(
            snapshots.timestamps().get(row) == Some(&timestamp),
            "Snapshot {timestamp} in row {} does not match the network's snapshots",
            row + 1
        );

        for (column, value) in columns.iter_mut().zip(record.iter().skip(1)) {
            let value: f64 = value
                .parse()
                .with_context(|| format!("Invalid value {value} for snapshot {timestamp}"))?;
            column.push(value);
        }
    }

    let mut series = IndexMap::new();
    for (name, values) in names.into_iter().zip(columns) {
        ensure!(
            values.len() == snapshots.len(),
            "Column {name} has {} values but there are {} snapshots",
            values.len(),
            snapshots.len()
        );
        ensure!(
            series.insert(name.to_string(), TimeSeries::new(values)).is_none(),
            "Duplicate column {name} found"
        );
    }

    Ok(series)
}

/// Attach each series to the component of the same name
fn assign_series<ID, T, F>(
    components: &mut IndexMap<ID, T>,
    series: IndexMap<String, TimeSeries>,
    mut set: F,
) -> Result<()>
where
    ID: IDLike,
    F: FnMut(&mut T, TimeSeries),
{
    for (name, values) in series {
        let component = components
            .get_mut(name.as_str())
            .with_context(|| format!("Unknown ID {name} found"))?;
        set(component, values);
    }

    Ok(())
}

/// Read all time-varying attributes of the network from `network_dir`
pub fn read_time_series(network_dir: &Path, network: &mut Network) -> Result<()> {
    for attribute in SeriesAttribute::ALL {
        let file_path = network_dir.join(attribute.file_name());
        let series = read_series_file(&file_path, &network.snapshots)?;
        assign_attribute(network, attribute, series).with_context(|| input_err_msg(&file_path))?;
    }

    Ok(())
}

fn assign_attribute(
    network: &mut Network,
    attribute: SeriesAttribute,
    series: IndexMap<String, TimeSeries>,
) -> Result<()> {
    match attribute {
        SeriesAttribute::GeneratorAvailability => {
            assign_series(&mut network.generators, series, |g, s| g.p_max_pu_t = Some(s))
        }
        SeriesAttribute::GeneratorDispatch => {
            assign_series(&mut network.generators, series, |g, s| g.dispatch = Some(s))
        }
        SeriesAttribute::StorageInflow => {
            assign_series(&mut network.storage_units, series, |u, s| u.inflow = Some(s))
        }
        SeriesAttribute::StorageDispatch => {
            assign_series(&mut network.storage_units, series, |u, s| u.p_dispatch = Some(s))
        }
        SeriesAttribute::StorageCharge => {
            assign_series(&mut network.storage_units, series, |u, s| u.p_store = Some(s))
        }
        SeriesAttribute::StorageStateOfCharge => {
            assign_series(&mut network.storage_units, series, |u, s| u.state_of_charge = Some(s))
        }
        SeriesAttribute::StorageSpill => {
            assign_series(&mut network.storage_units, series, |u, s| u.spill = Some(s))
        }
        SeriesAttribute::StorageEnergyBalanceDual => {
            assign_series(&mut network.storage_units, series, |u, s| u.mu_energy_balance = Some(s))
        }
        SeriesAttribute::StoreEnergy => {
            assign_series(&mut network.stores, series, |st, s| st.energy = Some(s))
        }
        SeriesAttribute::StorePower => {
            assign_series(&mut network.stores, series, |st, s| st.power = Some(s))
        }
        SeriesAttribute::LineFlow => {
            assign_series(&mut network.lines, series, |l, s| l.flow = Some(s))
        }
        SeriesAttribute::LinkFlow => {
            assign_series(&mut network.links, series, |l, s| l.flow = Some(s))
        }
        SeriesAttribute::LoadDemand => {
            assign_series(&mut network.loads, series, |l, s| l.p_set = s)
        }
        SeriesAttribute::BusMarginalPrice => {
            assign_series(&mut network.buses, series, |b, s| b.marginal_price = Some(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, network};
    use rstest::rstest;
    use std::fmt::Write;
    use std::fs;
    use tempfile::tempdir;

    /// Write a wide table with one column per name, with the value `k` at snapshot `k`
    fn write_table(file_path: &Path, snapshots: &Snapshots, names: &[&str]) {
        let mut contents = format!("snapshot,{}\n", names.join(","));
        for (k, timestamp) in snapshots.timestamps().iter().enumerate() {
            write!(&mut contents, "{}", timestamp.format("%Y-%m-%d %H:%M:%S")).unwrap();
            for _ in names {
                write!(&mut contents, ",{k}").unwrap();
            }
            contents.push('\n');
        }
        fs::write(file_path, contents).unwrap();
    }

    #[rstest]
    fn test_read_series_file(network: Network) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators-p.csv");
        write_table(&file_path, &network.snapshots, &["a", "b"]);

        let series = read_series_file(&file_path, &network.snapshots).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series["b"][3], 3.0);
        assert_eq!(series["a"].len(), network.snapshots.len());
    }

    #[rstest]
    fn test_read_series_file_missing(network: Network) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators-p.csv");
        assert!(read_series_file(&file_path, &network.snapshots).unwrap().is_empty());
    }

    #[rstest]
    fn test_read_series_file_wrong_snapshots(network: Network) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("generators-p.csv");
        let shorter = network.snapshots.slice(1..network.snapshots.len());
        write_table(&file_path, &shorter, &["a"]);
        assert!(read_series_file(&file_path, &network.snapshots).is_err());
    }

    #[rstest]
    fn test_assign_unknown_component(mut network: Network) {
        let series = [("nope".to_string(), TimeSeries::constant(0.0, 28))]
            .into_iter()
            .collect();
        assert_error!(
            assign_attribute(&mut network, SeriesAttribute::GeneratorDispatch, series),
            "Unknown ID nope found"
        );
    }

    #[rstest]
    fn test_read_time_series_inflow(mut network: Network) {
        let dir = tempdir().unwrap();
        let id = network.storage_units[0].id.clone();
        write_table(
            &dir.path().join(SeriesAttribute::StorageInflow.file_name()),
            &network.snapshots,
            &[id.as_str()],
        );

        read_time_series(dir.path(), &mut network).unwrap();
        let inflow = network.storage_units[0].inflow.as_ref().unwrap();
        assert_eq!(inflow[5], 5.0);
    }
}
