mod accountant;
mod cli;
mod error;
mod logging;
mod models;
mod money;
mod normalizer;
mod settings;
mod sheet;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(&settings::load_settings().log_level);

    let result = match cli.command {
        Commands::Init {
            data_file,
            budget,
            log_level,
        } => cli::init::run(data_file, budget, log_level),
        Commands::Report {
            source,
            status,
            client,
            json,
        } => cli::report::run(&source, &status, client.as_deref(), json),
        Commands::Totals { source, json } => cli::totals::run(&source, json),
        Commands::Status { file } => cli::status::run(file.as_deref()),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
