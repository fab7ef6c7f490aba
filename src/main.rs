use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tyrant_manager::{Fleet, ManagerConfig, Role, ShardKey, ShrinkOutcome, TuningOptions};

#[derive(Parser)]
#[command(name = "tyrantctl")]
#[command(about = "Manage month-sharded Tokyo Tyrant instances")]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show ports, unit and data file of a month
    Ports { month: ShardKey },
    /// Show which instance owns a port
    Whois { port: u16 },
    /// Write the launch unit of an instance
    Provision {
        role: Role,
        month: ShardKey,
        #[arg(long = "tune", value_name = "KNOB=VALUE")]
        tune: Vec<String>,
    },
    Start { role: Role, month: ShardKey },
    Stop { role: Role, month: ShardKey },
    /// Delete the launch unit of an instance
    RemoveScript { role: Role, month: ShardKey },
    /// Delete the data file of an instance
    RemoveData { role: Role, month: ShardKey },
    /// Delete launch unit and data file of an instance
    Decommission { role: Role, month: ShardKey },
    /// Restart the aging instance with a reduced memory footprint
    Shrink {
        role: Role,
        /// Date the retention window is counted back from (default: today)
        #[arg(long)]
        anchor: Option<NaiveDate>,
        /// Retention window in months (default: from config)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        window: Option<u32>,
        #[arg(long = "tune", value_name = "KNOB=VALUE")]
        tune: Vec<String>,
        /// Footprint to shrink to instead of the configured one
        #[arg(long)]
        memory: Option<String>,
    },
    /// Bring up the current month and shrink the aging one
    Rotate {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "tune", value_name = "KNOB=VALUE")]
        tune: Vec<String>,
    },
    /// Connect to the instance holding a date's data
    Resolve { date: NaiveDate },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let fleet = Fleet::local(config).context("Invalid configuration")?;
    let controller = fleet.controller();

    match cli.command {
        Command::Ports { month } => {
            let resolver = controller.resolver();
            let ports = resolver.ports_for(month)?;
            println!("month:  {}", month);
            for role in Role::ALL {
                println!(
                    "{:<7} port {}  unit {}  data {}",
                    role,
                    ports.port(role),
                    resolver.unit_for(role, month).path().display(),
                    resolver.data_file_for(role, month)
                );
            }
        }
        Command::Whois { port } => match controller.resolver().shard_for_port(port) {
            Some((role, month)) => println!("{} {}", role, month),
            None if port == fleet.config().default_port => println!("legacy"),
            None => println!("unassigned"),
        },
        Command::Provision { role, month, tune } => {
            let descriptor = controller.provision_launch_spec(role, month, &parse_tuning(&tune)?)?;
            println!("{}", descriptor.unit.path().display());
        }
        Command::Start { role, month } => controller.start(role, month)?,
        Command::Stop { role, month } => controller.stop(role, month)?,
        Command::RemoveScript { role, month } => controller.remove_launch_spec(role, month)?,
        Command::RemoveData { role, month } => controller.remove_data_file(role, month)?,
        Command::Decommission { role, month } => controller.decommission(role, month)?,
        Command::Shrink {
            role,
            anchor,
            window,
            tune,
            memory,
        } => {
            let anchor = anchor.unwrap_or_else(today);
            let window = window.unwrap_or(fleet.config().retention_window);
            let outcome = controller.shrink_aging_instance(
                role,
                anchor,
                window,
                &parse_tuning(&tune)?,
                memory.as_deref(),
            )?;
            report(&outcome);
        }
        Command::Rotate { date, tune } => {
            let date = date.unwrap_or_else(today);
            let outcomes = fleet.rotate(date, &parse_tuning(&tune)?)?;
            if outcomes.is_empty() {
                info!("{} already rotated, nothing to do", ShardKey::from_date(date)?);
            }
            for outcome in &outcomes {
                report(outcome);
            }
        }
        Command::Resolve { date } => {
            let connection = fleet
                .connections()
                .resolve(date)
                .with_context(|| format!("Failed to resolve a connection for {}", date))?;
            println!(
                "{}:{}{}",
                connection.host(),
                connection.port(),
                if connection.is_fallback() { " (legacy)" } else { "" }
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<ManagerConfig> {
    match path {
        Some(path) => ManagerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from '{}'", path.display())),
        None => Ok(ManagerConfig::default()),
    }
}

fn parse_tuning(assignments: &[String]) -> Result<TuningOptions> {
    TuningOptions::from_assignments(assignments).map_err(anyhow::Error::msg)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn report(outcome: &ShrinkOutcome) {
    match outcome {
        ShrinkOutcome::Shrunk(descriptor) => info!("{} shrunk and restarted", descriptor.unit),
        ShrinkOutcome::NotRunning { unit, .. } => info!("{} not running, left untouched", unit),
    }
}
