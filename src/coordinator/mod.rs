//! Polling coordinators
//!
//! - `scheduler`: generic interval update coordinator (publish/subscribe of the latest value)
//! - `summary`: 17track summary updater and status normalization

pub mod scheduler;
pub mod summary;

pub use scheduler::UpdateCoordinator;
pub use summary::{SummaryCoordinator, SummaryUpdater};
