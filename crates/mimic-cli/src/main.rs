//! Mimic command-line tool
//!
//! Inspects module manifests, discovers plugins implementing a capability,
//! and synthesizes mocks of capabilities.

mod commands;
mod literal;
mod natives;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mimic_engine::EngineConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mimic")]
#[command(about = "Runtime capability discovery and type synthesis", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (mimic.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Colorize output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the members of every type in a module
    Inspect {
        /// Module manifest (.toml or .json)
        module: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Find the types in a module that implement a capability
    Discover {
        /// Module manifest (.toml or .json)
        module: PathBuf,
        /// Capability schema (.toml or .json)
        capability: PathBuf,
        /// Invoke this method on every discovered instance
        #[arg(long)]
        run: Option<String>,
        /// Argument literal for --run (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Invoke instances on worker threads
        #[arg(long)]
        parallel: bool,
    },

    /// Synthesize a mock of a capability and show what it returns
    Mock {
        /// Capability schema (.toml or .json)
        capability: PathBuf,
        /// Override a method's result: NAME=LITERAL (repeatable)
        #[arg(long = "returning")]
        returning: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config, cli.verbose);
    tracing::debug!(
        config = ?cli.config,
        text_default = ?config.synthesis.text_default,
        allow_widening = config.invoke.allow_widening,
        "configuration loaded"
    );

    let mut out = output::StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));

    match cli.command {
        Commands::Inspect { module, json } => commands::inspect::execute(&mut out, &config, &module, json),
        Commands::Discover {
            module,
            capability,
            run,
            args,
            parallel,
        } => commands::discover::execute(
            &mut out,
            &config,
            &module,
            &capability,
            run.as_deref(),
            &args,
            parallel,
        ),
        Commands::Mock {
            capability,
            returning,
        } => commands::mock::execute(&mut out, &config, &capability, &returning),
    }
}

/// Install the log subscriber on stderr.
///
/// `RUST_LOG` wins; otherwise `-v` raises the level set in the config.
fn init_logging(config: &EngineConfig, verbose: u8) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
