//! fbconnect - a command-line front end for Facebook sessions.
//!
//! Logs in through the terminal, keeps the session in a file or the OS
//! keychain, and runs FQL queries and API calls with it.

mod commands;
mod config;
mod surface;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use fbconnect_core::{FileStore, KeyringStore, Session, SessionStore};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Command, Runner};
use config::{AppConfig, StoreBackend};
use surface::TerminalSurface;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn open_store(backend: StoreBackend) -> Result<Arc<dyn SessionStore>> {
    Ok(match backend {
        StoreBackend::File => Arc::new(FileStore::default_location()?),
        StoreBackend::Keyring => Arc::new(KeyringStore::default()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = AppConfig::load()?;

    if let Command::Configure { api_key, app_secret } = &command {
        config.api_key = Some(api_key.clone());
        config.app_secret = Some(app_secret.clone());
        config.save()?;
        println!("Saved credentials to {}", AppConfig::config_path()?.display());
        return Ok(());
    }

    config.apply_env();
    let (api_key, app_secret) = config.app_credentials()?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut builder = Session::builder(api_key, app_secret)
        .config(config.client.clone())
        .delegate(tx)
        .store(open_store(config.store)?)
        .storage_key(config.storage_key());
    if command != Command::Logout {
        builder = builder.login_surface(Arc::new(TerminalSurface::stdin()));
    }
    let session = builder.build()?;

    info!(store = ?config.store, key = config.storage_key(), "fbconnect starting");
    Runner::new(session, rx).run(command).await
}
