//! Application constants and environment-driven configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rand::RngCore;

/// Application-level constants
pub const APP_NAME: &str = "Casebook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,casebook=debug";

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_ACCESS_TTL_SECS: u64 = 900;

/// Get the application data directory (~/Casebook/).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Casebook")
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub token_secret: Vec<u8>,
    pub access_ttl: Duration,
}

impl Config {
    /// Read configuration from the environment:
    ///
    /// - `CASEBOOK_ADDR` — listen address (default `127.0.0.1:3000`)
    /// - `CASEBOOK_DB` — database path (default `~/Casebook/casebook.db`)
    /// - `CASEBOOK_TOKEN_SECRET` — JWT signing secret; when unset a
    ///   random ephemeral secret is generated, so sessions stop being
    ///   valid across restarts
    /// - `CASEBOOK_ACCESS_TTL_SECS` — access token lifetime (default 900)
    pub fn from_env() -> Result<Config, String> {
        let addr = match std::env::var("CASEBOOK_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid CASEBOOK_ADDR {raw:?}: {e}"))?,
            Err(_) => DEFAULT_ADDR.parse().map_err(|e| format!("{e}"))?,
        };

        let db_path = std::env::var("CASEBOOK_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("casebook.db"));

        let token_secret = match std::env::var("CASEBOOK_TOKEN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!(
                    "CASEBOOK_TOKEN_SECRET not set, using an ephemeral secret; \
                     sessions will not survive a restart"
                );
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };

        let access_ttl = match std::env::var("CASEBOOK_ACCESS_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|e| format!("Invalid CASEBOOK_ACCESS_TTL_SECS {raw:?}: {e}"))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_ACCESS_TTL_SECS),
        };

        Ok(Config {
            addr,
            db_path,
            token_secret,
            access_ttl,
        })
    }
}
