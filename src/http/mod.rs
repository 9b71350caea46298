pub mod app_error;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod state;
