pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;

// Use cases and the ports they depend on
pub mod app;
// Adapters implementing those ports
pub mod infra;
