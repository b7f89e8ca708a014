use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tabstrip::actor::reactor::{Scenario, replay};
use tabstrip::common::config::{Config, config_file};
use tabstrip::common::log::init_logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "Tab groups for ordinary windows")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session against a virtual desktop and print the
    /// resulting groups.
    Replay {
        scenario: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Tree)]
        format: Format,
    },
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the default configuration.
    Default,
    /// Parse and validate a config file.
    Check { path: Option<PathBuf> },
    /// Print where the config file is looked up.
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Tree,
    Json,
}

fn main() -> ExitCode {
    sigpipe::reset();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Replay { scenario, format } => {
            let config = Config::load(cli.config.as_deref())?;
            let scenario = Scenario::read(&scenario)?;
            let outcome = replay(&scenario, config)?;
            info!(steps = outcome.steps, groups = outcome.groups.len(), "Replay finished");
            let rendered = match format {
                Format::Tree => outcome.to_tree()?,
                Format::Json => outcome.to_json()?,
            };
            println!("{}", rendered.trim_end());
        }
        Commands::Config(ConfigCommand::Default) => {
            print!("{}", Config::default().to_toml()?);
        }
        Commands::Config(ConfigCommand::Check { path }) => {
            let path = path.or(cli.config).or_else(config_file).context("no config path")?;
            Config::read(&path)?;
            println!("{} is valid", path.display());
        }
        Commands::Config(ConfigCommand::Path) => match config_file() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("could not determine the config directory"),
        },
    }
    Ok(())
}
