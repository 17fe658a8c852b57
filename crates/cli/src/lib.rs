pub mod commands;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use shopsense_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "shopsense",
    about = "ShopSense operator CLI",
    long_about = "Operate ShopSense migrations, demo fixtures, readiness checks, \
                  config inspection, and recommendation runs.",
    after_help = "Examples:\n  shopsense doctor --json\n  shopsense seed\n  shopsense recommend C1000 --category Electronics"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and verify the row counts")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Ollama reachability, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Generate recommendations for one customer")]
    Recommend(RecommendArgs),
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[arg(help = "Customer id, e.g. C1000")]
    pub customer_id: String,
    #[arg(long, help = "Rank one category only", conflicts_with_all = ["occasion", "season", "similar_customers"])]
    pub category: Option<String>,
    #[arg(long, help = "Curate picks for an occasion (birthday, anniversary, ...)", conflicts_with_all = ["season", "similar_customers"])]
    pub occasion: Option<String>,
    #[arg(long, help = "Curate picks for a season (winter, summer, ...)", conflicts_with = "similar_customers")]
    pub season: Option<String>,
    #[arg(long, help = "Boost products recommended to similar customers")]
    pub similar_customers: bool,
    #[arg(long, help = "Maximum number of recommendations")]
    pub limit: Option<usize>,
    #[arg(long, help = "Emit the full recommendation outcome as JSON")]
    pub json: bool,
}

pub fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Recommend(args) => commands::recommend::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Best-effort subscriber init from the loaded config. Config errors are
/// ignored here; each command re-loads and reports them with a proper
/// exit code.
fn init_tracing() {
    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("info".to_string(), LogFormat::Compact),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let init_result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A second init in tests is fine to ignore.
    let _ = init_result;
}
