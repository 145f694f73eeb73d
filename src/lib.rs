pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod resources;
pub mod store;
pub mod types;
