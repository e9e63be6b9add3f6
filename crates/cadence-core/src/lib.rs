//! # cadence-core
//!
//! Core crate for Cadence. Contains configuration schemas, typed
//! identifiers, and the unified error system shared by the entity and
//! worker crates.
//!
//! This crate has **no** internal dependencies on other Cadence crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
