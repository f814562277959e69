// crates/server/src/config.rs
//! Environment-driven server configuration.
//!
//! Client configuration lives with the clients (`HackatimeConfig`,
//! `SubmissionStoreConfig`); this module covers the server's own knobs.

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47311;

/// Default raw-content host for source fetches.
pub const DEFAULT_CODEHOST_URL: &str = "https://raw.githubusercontent.com";

/// Server-level configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub codehost_url: String,
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// `HARBORVIEW_PORT` wins over `PORT`; both fall back to
    /// [`DEFAULT_PORT`]. `CODEHOST_BASE_URL` overrides the raw-content host.
    pub fn from_env() -> Self {
        let port = std::env::var("HARBORVIEW_PORT")
            .ok()
            .or_else(|| std::env::var("PORT").ok())
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let codehost_url = std::env::var("CODEHOST_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_CODEHOST_URL.to_string());

        Self { port, codehost_url }
    }
}
