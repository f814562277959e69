// crates/core/src/lib.rs
pub mod aggregate;
pub mod cluster;
pub mod deltas;
pub mod files;
pub mod heartbeat;
pub mod playback;

pub use aggregate::*;
pub use cluster::*;
pub use deltas::*;
pub use files::*;
pub use heartbeat::*;
pub use playback::*;
