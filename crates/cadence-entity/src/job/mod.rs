//! Scheduled job domain entities.

pub mod model;
pub mod retry;
pub mod status;
pub mod window;

pub use model::{Job, JobCounters, JobScope};
pub use retry::RetryPolicy;
pub use status::JobStatus;
pub use window::{SyncWindow, WindowError};
