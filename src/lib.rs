pub mod app_state;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod gateway;
pub mod health;
pub mod session;
pub mod telemetry;
