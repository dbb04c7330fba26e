//! Program settings, read from `settings.toml` in the user's configuration folder.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::optimisation::SolveOptions;
use crate::technology::{Technology, parse_technologies};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for drought_rh
# Uncomment a line to override the default value shown.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_load_shedding_cost() -> f64 {
    15_000.0
}

fn default_shortfall_technologies() -> Vec<String> {
    ["ror", "nuclear", "hydro"].map(String::from).to_vec()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The program log level (off, error, warn, info, debug or trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to replace output folders which already exist and are not empty
    #[serde(default)]
    pub overwrite: bool,
    /// Folder in which statistics tables are written
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Marginal cost of load shedding (per MWh)
    #[serde(default = "default_load_shedding_cost")]
    pub load_shedding_cost: f64,
    /// Technologies whose availability is reduced in a drought
    #[serde(default = "default_shortfall_technologies")]
    pub shortfall_technologies: Vec<String>,
    /// Number of snapshots shared by consecutive rolling horizon chunks
    #[serde(default)]
    pub rolling_horizon_overlap: usize,
    /// Time limit for each solver call, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_time_limit: Option<f64>,
    /// Number of threads used by the solver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_threads: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            results_dir: default_results_dir(),
            load_shedding_cost: default_load_shedding_cost(),
            shortfall_technologies: default_shortfall_technologies(),
            rolling_horizon_overlap: 0,
            solver_time_limit: None,
            solver_threads: None,
        }
    }
}

impl Settings {
    /// Read the settings file from the configuration folder.
    ///
    /// If the file is not present, default values are used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read settings from the given path, using defaults if there is no such file
    pub fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// The technologies whose availability is cut in a drought
    pub fn shortfall_technologies(&self) -> IndexSet<Technology> {
        parse_technologies(&self.shortfall_technologies)
    }

    /// Options passed to the solver
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            assign_all_duals: false,
            time_limit: self.solver_time_limit,
            threads: self.solver_threads,
        }
    }

    /// The contents of the default settings file, with every setting commented out
    pub fn default_file_contents() -> Result<String> {
        let settings_raw =
            toml::to_string(&Settings::default()).context("Could not convert settings to TOML")?;

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();
                let docs = Settings::get_field_docs(field)
                    .ok()
                    .with_context(|| format!("Missing doc comment for field {field}"))?;
                for line in docs.lines() {
                    write!(&mut out, "\n# # {}\n", line.trim())?;
                }

                writeln!(&mut out, "# {}", line.trim())?;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"").unwrap();
            writeln!(file, "shortfall_technologies = [\"hydro\"]").unwrap();
            writeln!(file, "solver_threads = 2").unwrap();
        }

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                shortfall_technologies: vec!["hydro".to_string()],
                solver_threads: Some(2),
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_shortfall_technologies() {
        let technologies = Settings::default().shortfall_technologies();
        assert_eq!(
            technologies.into_iter().collect::<Vec<_>>(),
            [Technology::Ror, Technology::Nuclear, Technology::Hydro]
        );
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# load_shedding_cost = 15000.0"));

        // Uncommenting every setting gives the defaults back
        let uncommented: String = contents
            .lines()
            .filter(|line| line.starts_with("# ") && !line.starts_with("# #"))
            .map(|line| format!("{}\n", &line[2..]))
            .filter(|line| line.contains('='))
            .collect();
        let settings: Settings = toml::from_str(&uncommented).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
