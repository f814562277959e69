// crates/clients/src/lib.rs
//! Outbound HTTP clients for the three external collaborators -- the
//! time-tracking admin service, the code host, and the spreadsheet data
//! service -- plus the sequential day-by-day heartbeat ingestion loop.
//!
//! All three parse defensively: missing or null upstream fields default to
//! empty/zero, and malformed records are logged and treated as absent.
//! Invalid configuration (empty tokens, unparseable base URLs) fails loudly
//! at client construction, never later.

pub mod codehost;
pub mod error;
pub mod hackatime;
pub mod ingest;
pub mod submissions;

pub use codehost::*;
pub use error::*;
pub use hackatime::*;
pub use ingest::*;
pub use submissions::*;
