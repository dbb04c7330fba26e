//! Metadata written alongside exported networks: how, when and from what they were produced.
use crate::network::Network;
use crate::units::Money;
use anyhow::{Context, Result};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
pub const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
    platform: Option<PlatformMetadata>,
}

/// Information about the scenario run which produced the network
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Name of the exported network (e.g. `DE_1.0_base_solved`)
    network_name: &'a str,
    /// Path to the network the run started from
    input_path: &'a Path,
    /// Number of snapshots in the network
    snapshots: usize,
    /// Objective of the most recent solve, if the network has been solved
    #[serde(skip_serializing_if = "Option::is_none")]
    objective: Option<f64>,
    /// The date and time at which the network was written
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(network: &'a Network, input_path: &'a Path) -> Self {
        Self {
            network_name: &network.name,
            input_path,
            snapshots: network.snapshots.len(),
            objective: network.objective.map(Money::value),
            datetime: Local::now().to_rfc2822(),
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used for the build
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash of the build (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform on which the program is running.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    osname: String,
    sysname: String,
    release: String,
    machine: String,
}

impl PlatformMetadata {
    /// Query the platform, returning `None` if this isn't possible
    fn query() -> Option<Self> {
        let info = PlatformInfo::new().ok()?;
        Some(Self {
            osname: info.osname().to_string_lossy().into(),
            sysname: info.sysname().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
        })
    }
}

/// Write metadata describing an exported network to its folder, in TOML format
pub fn write_metadata(output_path: &Path, network: &Network, input_path: &Path) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(network, input_path),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::query(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    let contents = toml::to_string(&metadata).context("Could not convert metadata to TOML")?;
    fs::write(&file_path, contents)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{network, solved_network};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_metadata(dir: &Path) -> toml::Table {
        let contents = fs::read_to_string(dir.join(METADATA_FILE_NAME)).unwrap();
        toml::from_str(&contents).unwrap()
    }

    #[rstest]
    fn test_write_metadata(network: Network) {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), &network, Path::new("networks/base")).unwrap();

        let value = read_metadata(dir.path());
        assert_eq!(value["run"]["input_path"].as_str(), Some("networks/base"));
        assert_eq!(value["run"]["network_name"].as_str(), Some("three_bus"));
        assert_eq!(value["run"]["snapshots"].as_integer(), Some(28));
        assert!(!value["run"].as_table().unwrap().contains_key("objective"));
        assert_eq!(
            value["program"]["name"].as_str(),
            Some(built_info::PKG_NAME)
        );
    }

    #[rstest]
    fn test_write_metadata_solved(solved_network: Network) {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), &solved_network, Path::new("networks/base")).unwrap();

        let objective = read_metadata(dir.path())["run"]["objective"]
            .as_float()
            .unwrap();
        assert_approx_eq!(f64, objective, solved_network.objective.unwrap().value());
    }
}
