mod audit;
mod cli;
mod conflicts;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod resolution;
mod settings;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FilesCommands};

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir, reviewer } => cli::init::run(data_dir, reviewer),
        Commands::Files { command } => match command {
            FilesCommands::Add { path, name } => cli::files::add(&path, name.as_deref()),
            FilesCommands::List => cli::files::list(),
        },
        Commands::Conflicts { files, json, fresh } => cli::conflicts::show(&files, json, fresh),
        Commands::Select {
            group,
            member,
            files,
            auto,
        } => cli::conflicts::select(&files, group, member, auto),
        Commands::Review { files } => cli::review::run(&files),
        Commands::Apply { files, json } => cli::conflicts::apply(&files, json),
        Commands::Report => cli::report::run(),
        Commands::Demo => cli::demo::run(),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
