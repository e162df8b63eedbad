pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;

// Layered boundaries: use cases and their ports, and the adapters behind them
pub mod app;
pub mod infra;
