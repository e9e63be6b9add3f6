//! Marketplace integration entities.

pub mod code;
pub mod config;

pub use code::IntegrationCode;
pub use config::SyncConfig;
