use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "coexist developers",
    version,
    about = "coexist - Melting-point estimation by solid-liquid coexistence with LAMMPS.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the four coexistence stages (heat, melt, cool, equilibrate) with LAMMPS.
    Run(RunArgs),
    /// Write the sorted two-phase starting structure as a LAMMPS data file.
    Build(BuildArgs),
    /// Summarize a LAMMPS data file or thermo log.
    Inspect(InspectArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that receives step_a..step_d and summary.toml.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Melting point guess in kelvin.
    #[arg(short = 't', long = "guess", value_name = "KELVIN")]
    pub melting_point_guess: Option<f64>,

    /// Number of MPI processes passed to the launcher.
    #[arg(short = 'n', long, value_name = "INT")]
    pub processors: Option<usize>,

    /// LAMMPS executable.
    #[arg(long = "lammps", value_name = "CMD")]
    pub lammps_command: Option<String>,

    /// MPI launcher used to start LAMMPS.
    #[arg(long, value_name = "CMD", conflicts_with = "no_launcher")]
    pub launcher: Option<String>,

    /// Run LAMMPS directly instead of through an MPI launcher.
    #[arg(long)]
    pub no_launcher: bool,

    /// Seed for velocity initialization; random when omitted.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Skip stages whose final.data already exists.
    #[arg(long)]
    pub resume: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S steps.heat=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output LAMMPS data file.
    #[arg(short, long, required = true, value_name = "FILE")]
    pub output: PathBuf,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(subcommand)]
    pub command: InspectCommands,
}

#[derive(Subcommand, Debug)]
pub enum InspectCommands {
    /// Atom counts, composition and box of a LAMMPS data file.
    Data {
        #[arg(required = true, value_name = "FILE")]
        path: PathBuf,
    },
    /// Thermo tables of a LAMMPS log.
    Thermo {
        #[arg(required = true, value_name = "LOG")]
        path: PathBuf,

        /// Export the last thermo table as CSV.
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_overrides() {
        let cli = Cli::parse_from([
            "coexist", "-vv", "run", "-t", "2900", "-n", "8", "--no-launcher", "--seed", "3",
            "-S", "steps.heat=100", "-S", "steps.melt=200",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.melting_point_guess, Some(2900.0));
        assert_eq!(args.processors, Some(8));
        assert!(args.no_launcher);
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.set_values, vec!["steps.heat=100", "steps.melt=200"]);
    }

    #[test]
    fn launcher_and_no_launcher_conflict() {
        let result =
            Cli::try_parse_from(["coexist", "run", "--launcher", "srun", "--no-launcher"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_an_output() {
        assert!(Cli::try_parse_from(["coexist", "build"]).is_err());
        assert!(Cli::try_parse_from(["coexist", "build", "-o", "cell.data"]).is_ok());
    }

    #[test]
    fn inspect_thermo_takes_optional_csv() {
        let cli =
            Cli::parse_from(["coexist", "inspect", "thermo", "log.lammps", "--csv", "t.csv"]);
        let Commands::Inspect(InspectArgs {
            command: InspectCommands::Thermo { path, csv },
        }) = cli.command
        else {
            panic!("expected inspect thermo");
        };
        assert_eq!(path, PathBuf::from("log.lammps"));
        assert_eq!(csv, Some(PathBuf::from("t.csv")));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["coexist", "-q", "-v", "build", "-o", "x"]).is_err());
    }
}
