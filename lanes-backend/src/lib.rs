pub mod api;
pub mod client;
pub mod config;
pub mod log_bridge;
pub mod server;
pub mod state;
