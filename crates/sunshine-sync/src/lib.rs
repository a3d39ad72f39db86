//! Keeping the stored forecast current.
//!
//! [`SyncTask`] runs one fetch-and-replace. [`SyncService`] decides when:
//! on first run, on a timer, and after location changes.

pub mod error;
pub mod service;
pub mod task;

pub use error::SyncError;
pub use service::{SyncHandle, SyncService};
pub use task::{client_config, preference_defaults, SyncOutcome, SyncTask};
