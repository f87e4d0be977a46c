mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "preingest",
    about = "Preingest actions for archive collections: run checks, inspect results, serve the API",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file
    #[arg(
        long,
        global = true,
        env = "PREINGEST_CONFIG",
        default_value = preingest_core::paths::SETTINGS_FILE
    )]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to listen on (0 picks a free port)
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Calculate the checksum of a collection's container file
    Checksum {
        /// Collection file name inside the data folder
        collection: String,
        /// MD5, SHA1, SHA224, SHA256, SHA384 or SHA512 (dashes optional)
        #[arg(long, short = 'a')]
        algorithm: String,
        /// Digest to compare the calculated one against
        #[arg(long, short = 'e')]
        expected: Option<String>,
    },

    /// List the actions recorded for a session
    Actions {
        /// Session id, or a collection file name to derive it from
        session: String,
    },

    /// Show the loaded settings and validate them
    Config,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(&cli.config, port),
        Commands::Checksum {
            collection,
            algorithm,
            expected,
        } => cmd::checksum::run(&cli.config, &collection, &algorithm, expected, cli.json),
        Commands::Actions { session } => cmd::actions::run(&cli.config, &session, cli.json),
        Commands::Config => cmd::config::run(&cli.config, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
