mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod payslip;
mod pdf;
mod reconciler;
mod runsheet;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands, ImportCommands, JobsCommands};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // Logs go to stderr so table and JSON output stay clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { command } => match command {
            ImportCommands::Runsheet {
                files,
                date,
                strategy,
            } => cli::import::runsheets(&files, date.as_deref(), strategy),
            ImportCommands::Payslip { files } => cli::import::payslips(&files),
        },
        Commands::Parse {
            file,
            strategy,
            json,
        } => cli::parse::run(&file, strategy, json),
        Commands::Jobs { command } => match command {
            JobsCommands::List {
                date,
                from_date,
                to_date,
            } => cli::jobs::list(date.as_deref(), from_date.as_deref(), to_date.as_deref()),
            JobsCommands::Dnco {
                date,
                job_number,
                undo,
            } => cli::jobs::dnco(&date, &job_number, undo),
            JobsCommands::History { job_number } => cli::jobs::history(&job_number),
        },
        Commands::Payslips => cli::payslips::list(),
        Commands::Reconcile { from_date, to_date } => {
            cli::reconcile::run(from_date.as_deref(), to_date.as_deref())
        }
        Commands::Status => cli::status::run(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Path => cli::config::path(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
