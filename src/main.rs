use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod lifecycle;
mod remote;
mod session;
#[cfg(test)]
mod testing;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::remote::http::HttpQueryService;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Using query service at {}", config.backend.base_url);
    let service = match HttpQueryService::new(&config.backend) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Failed to create query service client: {}", e);
            return Err(e.into());
        }
    };

    let app_state = Arc::new(AppState::new(config.clone(), service.clone(), service));

    // Pick up a session the service still holds a cookie for
    if app_state.sessions.restore().await {
        info!("Resumed existing session");
    }

    // Start the web server
    info!("Starting Query Wizard on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
