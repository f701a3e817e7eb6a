pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use costdeck_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, ReferenceTime};
use costdeck_core::errors::ApplicationError;
use costdeck_core::DatasetKind;

use commands::list::ListArgs;
use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "costdeck",
    about = "Costdeck recommendation dataset CLI",
    long_about = "Generate the deterministic cost-optimization recommendation dataset and run totals, priority counts and filtered listings over it.",
    after_help = "Examples:\n  costdeck totals --status actioned\n  costdeck priority-count --category Rightsizing\n  costdeck list --dataset saas --sort savings --descending --per-page 10\n  costdeck config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a costdeck.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Dataset to generate: cloud|saas")]
    dataset: Option<DatasetKind>,
    #[arg(long, global = true, help = "Generator seed")]
    seed: Option<u64>,
    #[arg(long, global = true, help = "Reference time: fixed|now|RFC 3339 timestamp")]
    reference_time: Option<ReferenceTime>,
    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact|pretty|json")]
    log_format: Option<LogFormat>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dataset: self.dataset,
            seed: self.seed,
            reference_time: self.reference_time,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate the dataset and print every recommendation row")]
    Generate {
        #[arg(long, help = "Include per-population and per-pass generation counts")]
        summary: bool,
    },
    #[command(about = "Savings totals for a status filter alongside the unfiltered totals")]
    Totals {
        #[arg(long = "status", help = "Status to include (repeatable); none means all")]
        statuses: Vec<String>,
    },
    #[command(about = "Count high-priority recommendations in a category")]
    PriorityCount {
        #[arg(long)]
        category: String,
        #[arg(long = "status", help = "Status to include (repeatable); none means all")]
        statuses: Vec<String>,
    },
    #[command(about = "Filter, sort, group and paginate recommendations")]
    List(ListArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Totals { .. } => "totals",
            Self::PriorityCount { .. } => "priority-count",
            Self::List(_) => "list",
            Self::Config => "config",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();
    let overrides = cli.global.overrides();

    let config = match AppConfig::load(LoadOptions {
        config_path: cli.global.config.clone(),
        require_file: cli.global.config.is_some(),
        overrides: overrides.clone(),
    }) {
        Ok(config) => config,
        Err(error) => {
            let result = CommandResult::from_error(command, &ApplicationError::from(error));
            println!("{}", result.output);
            return ExitCode::from(result.exit_code);
        }
    };
    init_logging(&config);

    let result = match &cli.command {
        Command::Generate { summary } => commands::generate::run(&config, *summary),
        Command::Totals { statuses } => commands::totals::run(&config, statuses),
        Command::PriorityCount { category, statuses } => {
            commands::priority_count::run(&config, category, statuses)
        }
        Command::List(args) => commands::list::run(&config, args),
        Command::Config => {
            commands::config::run(&config, cli.global.config.as_deref(), &overrides)
        }
    };

    tracing::info!(
        event_name = "cli.command_completed",
        command,
        exit_code = result.exit_code,
        "command completed"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries only the JSON envelope.
fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}
