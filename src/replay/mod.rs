mod artifacts;
mod error;
mod history;
mod runner;

pub use artifacts::{RunArtifacts, RunLog};
pub use error::{HistoryError, ReplayError};
pub use history::{HistoryRecorder, HistoryRow, HistoryTable, Series};
pub use runner::{expected_ticks, ReplayLoop, ReplayOutcome, ReplayState};
