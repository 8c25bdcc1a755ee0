use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use casebook::api::schema::build_schema;
use casebook::api::server::start_server;
use casebook::api::types::ApiContext;
use casebook::auth::{AuthService, TokenSigner};
use casebook::config::{Config, DEFAULT_LOG_FILTER};
use casebook::db::DocumentStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(parent) = config.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), "Cannot create data directory: {e}");
            return ExitCode::FAILURE;
        }
    }

    // Fail fast on an unusable database, rather than serving requests
    // that can never succeed.
    let store = match DocumentStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(path = %config.db_path.display(), "Cannot open database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let signer = TokenSigner::new(&config.token_secret, config.access_ttl);
    let ctx = ApiContext {
        auth: AuthService::new(store.clone(), signer),
        schema: build_schema(store),
    };

    let mut server = match start_server(ctx, config.addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %server.addr, "Casebook listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();

    ExitCode::SUCCESS
}
