use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use icontrol_sim::cli::{format_banner, Args};
use icontrol_sim::config::{load_env_file, ServerConfig};
use icontrol_sim::server::{create_router, AppState};

#[tokio::main]
async fn main() {
    let mut args = Args::parse();

    // Load .env file if specified, then re-read the CLI so its values feed
    // the env fallbacks
    if let Some(ref env_file) = args.env_file {
        if let Err(e) = load_env_file(env_file) {
            eprintln!("{}", e);
            process::exit(1);
        }
        args = Args::parse();
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let state = AppState::new(config.credentials.clone());
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.addr, e);
            process::exit(1);
        }
    };

    for line in format_banner(&config).lines() {
        info!("{}", line);
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
