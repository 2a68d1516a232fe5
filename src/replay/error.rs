use thiserror::Error;

use crate::message::MessageError;
use crate::replay::ReplayState;
use crate::track::TrackError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history is empty")]
    Empty,
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("tick interval must be positive and finite, got {0}")]
    InvalidTick(f64),
    #[error("expected state {expected}, loop is {actual}")]
    InvalidState {
        expected: ReplayState,
        actual: ReplayState,
    },
    #[error("track error: {0}")]
    Track(#[from] TrackError),
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("controller lock poisoned")]
    ControllerPoisoned,
}
