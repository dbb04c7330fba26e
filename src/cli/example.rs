//! The bundled example networks and the CLI commands for interacting with them.
use super::{BaseArgs, DroughtArgs, handle_base_command, handle_drought_command};
use crate::input::read_toml;
use crate::scenario::{EquityOption, InvestmentPolicy, ReductionFactor};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example networks.
const EXAMPLES_DIR: Dir = include_dir!("demos");

/// The file describing the scenarios run for an example
const SCENARIO_FILE_NAME: &str = "scenario.toml";

/// The available subcommands for managing example networks.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example network to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Run the base and drought scenarios of an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Run { name, output_dir } => {
                handle_example_run_command(&name, output_dir.as_deref(), None)?;
            }
        }

        Ok(())
    }
}

/// Parameters of the scenarios run for an example, read from `scenario.toml`
#[derive(Debug, Deserialize)]
struct ExampleScenario {
    co2_price: f64,
    horizon: usize,
    equity: String,
    country: String,
    tl: String,
    bus: String,
    contingency: String,
    reduction: f64,
    duration: u32,
    policy: String,
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for entry in EXAMPLES_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = EXAMPLES_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")?;

    println!("{readme}");

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Extract the specified example to a new directory
pub fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let sub_dir = EXAMPLES_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir(new_path)?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(dir) => bail!(
                "Subdirectories in examples not supported: {}",
                dir.path().display()
            ),
            DirEntry::File(f) => {
                let file_name = f
                    .path()
                    .file_name()
                    .with_context(|| format!("Invalid file path {}", f.path().display()))?;
                fs::write(new_path.join(file_name), f.contents())?;
            }
        }
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The base scenario is solved first and the drought scenario is then run from its solution.
/// Networks are written to subfolders of `output_path` (by default `<name>_results`), as are the
/// statistics tables.
pub fn handle_example_run_command(
    name: &str,
    output_path: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let network_path = temp_dir.path().join(name);
    extract_example(name, &network_path)?;
    let scenario: ExampleScenario = read_toml(&network_path.join(SCENARIO_FILE_NAME))?;

    let output_path = output_path.map_or_else(
        || PathBuf::from(format!("{name}_results")),
        Path::to_path_buf,
    );
    let mut settings = match settings {
        Some(settings) => settings,
        None => Settings::load().context("Failed to load settings.")?,
    };
    settings.results_dir = output_path.join("results");

    let equity: EquityOption = scenario.equity.parse()?;
    let base = BaseArgs {
        input: network_path.clone(),
        output: output_path.join("base"),
        co2_price: scenario.co2_price,
        output_rh: output_path.join("base_rh"),
        horizon: scenario.horizon,
        equity,
        country: scenario.country.clone(),
        tl: scenario.tl.clone(),
        bus: scenario.bus.clone(),
    };
    handle_base_command(&base, Some(settings.clone()))?;

    let policy = <InvestmentPolicy as clap::ValueEnum>::from_str(&scenario.policy, false)
        .map_err(|err| anyhow::anyhow!("Invalid policy in {SCENARIO_FILE_NAME}: {err}"))?;
    let drought = DroughtArgs {
        input: base.output.clone(),
        output: output_path.join("drought"),
        output_roll: output_path.join("drought_roll"),
        contingency: scenario.contingency,
        reduction: ReductionFactor::new(scenario.reduction)?,
        duration: scenario.duration,
        policy,
        horizon: scenario.horizon,
        country: scenario.country,
        equity,
        tl: scenario.tl,
        bus: scenario.bus,
    };
    handle_drought_command(&drought, Some(settings))
}
