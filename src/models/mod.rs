// Data Models
pub mod update;

pub use update::{RetryPolicy, UpdateOutcome, UpdateRequest, UpdateStage, UpdaterConfig};
