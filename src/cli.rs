//! The command line interface for drought scenario runs.
use crate::input::load_network;
use crate::log;
use crate::output::{create_output_directory, export_network};
use crate::scenario::{
    BaseScenario, DroughtScenario, EquityOption, InvestmentPolicy, ReductionFactor, solve_base,
    solve_drought,
};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for drought scenario runs.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Arguments for the base scenario
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Folder containing the input network
    pub input: PathBuf,
    /// Folder for the solved network
    pub output: PathBuf,
    /// Price of CO2 emissions (per tonne)
    pub co2_price: f64,
    /// Folder for the network solved with a rolling horizon
    pub output_rh: PathBuf,
    /// Number of snapshots optimised at once in the rolling horizon run
    pub horizon: usize,
    /// Equity option, e.g. EQ0.7c (per country) or EQ0.7 (per node)
    pub equity: EquityOption,
    /// The focus country
    pub country: String,
    /// Label of the transmission expansion limit
    pub tl: String,
    /// Label of the bus configuration
    pub bus: String,
}

/// Arguments for a drought scenario
#[derive(Args, Debug, Clone)]
pub struct DroughtArgs {
    /// Folder containing the solved base network
    pub input: PathBuf,
    /// Folder for the solved drought network
    pub output: PathBuf,
    /// Folder for the drought network solved with a rolling horizon
    pub output_roll: PathBuf,
    /// Label of the contingency
    pub contingency: String,
    /// Fraction of availability remaining during the drought
    pub reduction: ReductionFactor,
    /// Length of the drought in days
    pub duration: u32,
    /// Whether new capacity may be built in response to the drought
    pub policy: InvestmentPolicy,
    /// Number of snapshots optimised at once in the rolling horizon run
    pub horizon: usize,
    /// The focus country
    pub country: String,
    /// Equity option, e.g. EQ0.7c (per country) or EQ0.7 (per node)
    pub equity: EquityOption,
    /// Label of the transmission expansion limit
    pub tl: String,
    /// Label of the bus configuration
    pub bus: String,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Solve the base scenario with perfect foresight and with a rolling horizon.
    Base(BaseArgs),
    /// Solve a drought scenario from a solved base network.
    Drought(DroughtArgs),
    /// Manage the bundled example networks.
    Example {
        /// The available subcommands for managing example networks.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Base(args) => handle_base_command(&args, None),
            Self::Drought(args) => handle_drought_command(&args, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ drought_rh --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load settings from the settings file, unless provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Create the output folders and start logging into the first of them
fn prepare_outputs(settings: &Settings, output_dirs: &[&Path]) -> Result<()> {
    let mut overwritten = Vec::new();
    for dir in output_dirs {
        if create_output_directory(dir, settings.overwrite)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?
        {
            overwritten.push(*dir);
        }
    }

    if !log::is_logger_initialised() {
        log::init(Some(&settings.log_level), output_dirs.first().copied())
            .context("Failed to initialise logging.")?;
    }

    // NB: We have to wait until the logger is initialised to display these warnings
    for dir in overwritten {
        warn!("Output folder {} was overwritten", dir.display());
    }

    Ok(())
}

/// Handle the `base` command.
pub fn handle_base_command(args: &BaseArgs, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    prepare_outputs(&settings, &[&args.output, &args.output_rh])?;

    let network = load_network(&args.input).context("Failed to load network.")?;
    let scenario = BaseScenario {
        co2_price: args.co2_price,
        horizon: args.horizon,
        equity: args.equity,
        country: args.country.clone(),
        tl: args.tl.clone(),
    };
    info!("Running base scenario for {} (bus {})", args.country, args.bus);
    let outcome = solve_base(network, &scenario, &settings)?;

    export_network(&outcome.solved, &args.output, &args.input)?;
    export_network(&outcome.rolling, &args.output_rh, &args.input)?;
    info!("Base scenario complete!");

    Ok(())
}

/// Handle the `drought` command.
pub fn handle_drought_command(args: &DroughtArgs, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    prepare_outputs(&settings, &[&args.output, &args.output_roll])?;

    let base = load_network(&args.input).context("Failed to load base network.")?;
    let scenario = DroughtScenario {
        contingency: args.contingency.clone(),
        reduction: args.reduction,
        duration: args.duration,
        policy: args.policy,
        horizon: args.horizon,
        country: args.country.clone(),
        equity: args.equity,
        tl: args.tl.clone(),
        bus: args.bus.clone(),
    };
    info!("Running drought scenario {}", scenario.solved_name());
    let outcome = solve_drought(&base, &scenario, &settings)?;

    export_network(&outcome.solved, &args.output, &args.input)?;
    export_network(&outcome.rolling, &args.output_roll, &args.input)?;
    info!("Drought scenario complete!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_base_args() {
        let cli = Cli::try_parse_from([
            "drought_rh", "base", "in", "out", "50", "out_rh", "24", "EQ0.7c", "DE", "1.0", "3",
        ])
        .unwrap();
        let Some(Commands::Base(args)) = cli.command else {
            panic!("Expected base command");
        };
        assert_eq!(args.horizon, 24);
        assert_eq!(args.equity, "EQ0.7c".parse::<EquityOption>().unwrap());
        assert_eq!(args.output_rh, PathBuf::from("out_rh"));
    }

    #[test]
    fn test_parse_drought_args() {
        let cli = Cli::try_parse_from([
            "drought_rh",
            "drought",
            "base",
            "out",
            "out_roll",
            "dry",
            "0.5",
            "14",
            "noinv",
            "24",
            "DE",
            "EQ0.7c",
            "1.0",
            "3",
        ])
        .unwrap();
        let Some(Commands::Drought(args)) = cli.command else {
            panic!("Expected drought command");
        };
        assert_eq!(args.reduction.value(), 0.5);
        assert_eq!(args.duration, 14);
        assert_eq!(args.policy, InvestmentPolicy::NoInvestment);
    }

    #[test]
    fn test_parse_drought_args_invalid_reduction() {
        let result = Cli::try_parse_from([
            "drought_rh",
            "drought",
            "base",
            "out",
            "out_roll",
            "dry",
            "1.5",
            "14",
            "noinv",
            "24",
            "DE",
            "EQ0.7c",
            "1.0",
            "3",
        ]);
        assert!(result.is_err());
    }
}
