use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use scrobble_station::config::Config;
use scrobble_station::{pipeline, server};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scrobble-station")]
#[command(version, about = "Scrobble ingestion and listening analytics", long_about = None)]
struct Cli {
    /// Directory holding the scrobble log
    #[arg(long, global = true, env = "SCROBBLE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory receiving the analytics snapshot
    #[arg(long, global = true, env = "SCROBBLE_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Append scrobbles from a JSON export file to the log
    Ingest {
        /// JSON file whose top-level value is an array of scrobbles
        input: Option<PathBuf>,
    },
    /// Recompute the analytics snapshot from the whole log
    Build,
    /// Serve ingestion and analytics over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "SCROBBLE_PORT", default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity; logs go to stderr, summaries to stdout
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            if reports_parse_detail(&e) {
                eprintln!("{}", e);
            }
            return usage();
        }
    };

    let Some(command) = cli.command else {
        return usage();
    };
    let config = Config::new(cli.data_dir, cli.output_dir);

    match run(config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Unknown or missing subcommands only get the usage text; anything else,
/// such as a malformed flag value, also gets clap's diagnostic.
fn reports_parse_detail(e: &clap::Error) -> bool {
    !matches!(
        e.kind(),
        ErrorKind::InvalidSubcommand
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

fn usage() -> ExitCode {
    println!("{}", Cli::command().render_help());
    ExitCode::from(1)
}

async fn run(config: Config, command: Command) -> Result<()> {
    match command {
        Command::Ingest { input } => {
            let input = input.unwrap_or_default();
            let report = pipeline::ingest(&config, &input)
                .await
                .context("Ingestion failed")?;
            println!(
                "Ingested {} scrobbles ({} skipped) into {}",
                report.ingested,
                report.skipped,
                report.output_path.display()
            );
        }
        Command::Build => {
            let report = pipeline::build(&config).await.context("Build failed")?;
            println!(
                "Built analytics from {} scrobbles into {}",
                report.processed,
                report.output_path.display()
            );
        }
        Command::Serve { port } => {
            tracing::info!("Scrobble log: {}", config.log_path().display());
            tracing::info!("Snapshot: {}", config.snapshot_path().display());

            let app = server::create_router(config);
            let addr = format!("0.0.0.0:{}", port);

            tracing::info!("Server listening on http://{}", addr);
            tracing::info!("API endpoints:");
            tracing::info!("  POST /ingest     - Append a JSON array of scrobbles");
            tracing::info!("  POST /build      - Rebuild the analytics snapshot");
            tracing::info!("  GET  /analytics  - Latest analytics snapshot");

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .context("Failed to bind to address")?;
            axum::serve(listener, app).await.context("Server error")?;
        }
    }
    Ok(())
}
