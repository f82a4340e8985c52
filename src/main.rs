//! ==============================================================================
//! main.rs - satellite terminal dashboard backend entry point
//! ==============================================================================
//!
//! purpose:
//!     the process the desktop shell launches next to the dashboard ui.
//!     it samples the terminal's telemetry on a fixed cadence and serves the
//!     latest state over a loopback json api.
//!
//! responsibilities:
//!     - load configuration (config/dashboard.toml, defaults if absent)
//!     - initialize console logging
//!     - build the shared state store and the device client
//!     - run the sampler and the api server side by side until ctrl-c
//!
//! relationships:
//!     - uses: config.rs, device.rs, sampler.rs, api.rs, store.rs
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                   backend (this file)                    │
//!     │  ┌─────────────┐                    ┌────────────────┐   │
//!     │  │  sampler    │                    │   api server   │   │
//!     │  │ (2s cycle)  │                    │ 127.0.0.1:8000 │   │
//!     │  └──────┬──────┘                    └───────┬────────┘   │
//!     │         │ writes                      reads │            │
//!     │         └──────────►┌─────────────┐◄───────┘            │
//!     │                     │ state store │ <- store.rs          │
//!     │                     └─────────────┘                      │
//!     └─────────┬────────────────────────────────────────────────┘
//!               │ device client
//!               ▼
//!        ┌─────────────┐                        ┌─────────────┐
//!        │    dish     │                        │  ui client  │
//!        │ (or mock)   │                        │ (external)  │
//!        └─────────────┘                        └─────────────┘
//!
//! ==============================================================================

mod api;
mod config;
mod device;
mod domain;
mod error;
mod history;
mod logstore;
mod sampler;
mod store;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Starlink Dashboard Backend");
    println!("===========================================================");

    // step 1: load configuration (an invalid file stops startup here)
    let config = config::DashboardConfig::load_or_default()?;

    // step 2: logging (RUST_LOG wins over the config file)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    config.print_summary();

    // step 3: shared state and device client
    let store = store::StateStore::new(config.history.capacity, config.logs.capacity);
    let client = device::build_client(&config.device, config.polling.timeout())?;

    // step 4: api server in background
    let addr = config.bind_addr()?;
    let mut server = tokio::spawn(api::serve(store.clone(), addr, shutdown_signal()));

    // step 5: sampler runs here until ctrl-c
    let sampler = sampler::Sampler::new(
        client,
        store,
        config.polling.interval(),
        config.polling.timeout(),
    )
    .show_samples(config.logging.show_samples);

    tokio::select! {
        _ = sampler.run() => {}
        // server exiting on its own means it never bound or crashed
        result = &mut server => {
            return finish_server(result);
        }
        _ = shutdown_signal() => {
            info!("[SHUTDOWN] ctrl-c received, stopping sampler");
        }
    }

    finish_server(server.await)
}

fn finish_server(result: Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(Ok(())) => {
            info!("[SHUTDOWN] api server stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("[ERROR] api server failed: {:#}", e);
            Err(e)
        }
        Err(e) => {
            error!("[ERROR] api server task panicked: {}", e);
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("[ERROR] failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
