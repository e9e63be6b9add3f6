//! # cadence-entity
//!
//! Domain entities for Cadence: the [`job::Job`] lifecycle with its retry
//! bookkeeping, the retry backoff policy, and the integration and report
//! value types that scope jobs.

pub mod integration;
pub mod job;
pub mod report;
