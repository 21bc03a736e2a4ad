//! Vigil CLI - conformance harness for total-order multicast and membership.
//!
//! Commands:
//! - `vigil list` - List built-in scenarios
//! - `vigil plan` - Show what a scenario would run for the configured hosts
//! - `vigil run` - Run scenarios against Docker peers or the simulator
//! - `vigil classify` - Classify a saved peer log

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vigil_scenario::{Family, HarnessConfig};

mod commands;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Log-driven conformance harness for total-order multicast and group membership")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Path to the harness configuration (YAML)
    #[arg(short, long, global = true, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Hostfile overriding the configured hosts
    #[arg(long, global = true, env = "VIGIL_HOSTFILE")]
    hostfile: Option<PathBuf>,

    /// Comma-separated hosts overriding the configured hosts
    #[arg(long, global = true, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Settle delay after each induced crash, in milliseconds
    #[arg(long, global = true)]
    settle_ms: Option<u64>,

    /// Observation timeout, in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Protocol family filter.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    /// Total-order multicast
    Multicast,
    /// Group membership
    Membership,
}

impl FamilyArg {
    /// The scenario family this selects.
    pub const fn family(self) -> Family {
        match self {
            Self::Multicast => Family::Multicast,
            Self::Membership => Family::Membership,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in scenarios
    List {
        /// Only scenarios of this family
        #[arg(short, long, value_enum)]
        family: Option<FamilyArg>,
    },

    /// Show the plan and peer arguments of a scenario
    Plan {
        /// Scenario name
        scenario: String,
    },

    /// Run scenarios and verify the peers' logs
    Run {
        /// Scenario names
        scenarios: Vec<String>,

        /// Run every scenario
        #[arg(long, conflicts_with = "scenarios")]
        all: bool,

        /// Restrict --all to one family
        #[arg(short, long, value_enum, requires = "all")]
        family: Option<FamilyArg>,

        /// Run against in-memory simulated peers instead of Docker
        #[arg(long)]
        simulate: bool,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a saved peer log and print per-kind counts
    Classify {
        /// Log file
        file: PathBuf,

        /// Only use one family's markers
        #[arg(short, long, value_enum)]
        family: Option<FamilyArg>,

        /// Print every classified event, not just the summary
        #[arg(short, long)]
        events: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let config = load_config(&cli)?;
    match cli.command {
        Commands::List { family } => {
            commands::list::run(family);
            Ok(())
        }
        Commands::Plan { scenario } => commands::plan::run(&config, &scenario),
        Commands::Run {
            scenarios,
            all,
            family,
            simulate,
            json,
        } => {
            let selected = commands::run::select(&scenarios, all, family)?;
            commands::run::run(config, &selected, simulate, json).await
        }
        Commands::Classify {
            file,
            family,
            events,
            json,
        } => commands::classify::run(&config, &file, family, events, json),
    }
}

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    if !cli.hosts.is_empty() {
        config.hosts.clone_from(&cli.hosts);
        config.hostfile = None;
    }
    if let Some(hostfile) = &cli.hostfile {
        config.hostfile = Some(hostfile.clone());
    }
    if let Some(ms) = cli.settle_ms {
        config.timing.settle_delay_ms = ms;
    }
    if let Some(ms) = cli.timeout_ms {
        config.timing.scenario_timeout_ms = ms;
    }
    Ok(config)
}
