//! Command-line entry point for cognate

use clap::Parser;
use cognate_cli::commands::{Commands, RunContext};
use cognate_cli::config::CliConfig;
use cognate_cli::CliResult;
use std::path::PathBuf;

/// Tabulate and refine sound correspondences
#[derive(Debug, Parser)]
#[command(name = "cognate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "COGNATE_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Initialize logging based on verbosity level
    fn init_logging(&self) {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        if !self.quiet {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
                .init();
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    cli.init_logging();
    log::debug!("Arguments: {:?}", cli);

    let context = RunContext {
        config: CliConfig::load(cli.config.as_deref())?,
        quiet: cli.quiet,
    };
    cli.command.execute(&context)
}
