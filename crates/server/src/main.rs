// crates/server/src/main.rs
//! Harborview server binary.
//!
//! Validates collaborator configuration loudly before binding anything,
//! then serves the review API on localhost. Ingestion is request-driven;
//! there is no background work at startup.

use std::net::SocketAddr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use harborview_clients::{
    CodeHostClient, HackatimeClient, HackatimeConfig, SubmissionStore, SubmissionStoreConfig,
};
use harborview_server::{create_app, init_metrics, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; default keeps our own crates at info and deps quiet.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("harborview=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    init_metrics();

    let config = ServerConfig::from_env();

    // Invalid tokens or base URLs fail here, before the server binds --
    // misconfiguration is a startup error, never a mid-review surprise.
    let hackatime = HackatimeClient::new(HackatimeConfig::from_env()?)?;
    let codehost = CodeHostClient::new(config.codehost_url.clone())?;
    let store = SubmissionStore::new(SubmissionStoreConfig::from_env()?)?;

    let state = AppState::new(hackatime, codehost, store);
    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("\n\u{2693} harborview v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} http://localhost:{}\n", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
