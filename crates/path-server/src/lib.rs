//! path-server
//!
//! Multi-client async TCP server for pathfinding requests.

pub mod config;
pub mod types;
pub mod log_sink;
pub mod server;
pub mod status;

// per-connection handling is internal, driven by `server`
mod client;

pub use client::SessionError;
