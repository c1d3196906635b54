//! # Mudlink
//!
//! Command line companion for the `telnet-automata` engine: replays
//! captured server traffic through a protocol session and prints the
//! negotiation tables the engine runs on.

pub mod config;
pub mod errors;
pub mod render;
pub mod replay;

pub use config::{ConfigError, ConfigOrigin, MudlinkConfig};
pub use errors::{AppError, AppResult};
