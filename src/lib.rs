pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod schema;
pub mod table;

pub mod pipeline;
pub mod verify;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
