use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "daterange-cli", version, about = "DateRange filter CLI")]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the filter query for a date range
    Query(commands::query::QueryArgs),
    /// Print calendar markings for a date range
    Marks(commands::marks::MarksArgs),
    /// Run a scripted scenario against an in-memory store
    Simulate(commands::simulate::SimulateArgs),
    /// Controller configuration files
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::LoggingConfig {
        level: cli.log_level,
        format: cli.log_format,
    }
    .init();

    let result = match cli.command {
        Commands::Query(args) => commands::query::run(args),
        Commands::Marks(args) => commands::marks::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
