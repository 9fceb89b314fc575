use clap::Parser;
use pzmod_server::Catalog;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pzmod-server", about = "Workshop details protocol reference server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8322)]
    port: u16,

    /// JSON array of detail rows to serve.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Reject requests whose `key` does not match.
    #[arg(long)]
    api_key: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.fixtures {
        Some(path) => match Catalog::load(path, cli.api_key.clone()) {
            Ok(c) => c,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Catalog::new(cli.api_key.clone()),
    };
    info!("serving {} catalog rows", catalog.len());

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting pzmod-server on {addr}");
    if let Err(e) = pzmod_server::run_server(&Arc::new(catalog), &addr) {
        error!("server failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
