use thiserror::Error;

use crate::controller::ControllerError;
use crate::message::MessageError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    #[error("controller rejected envelope: {0}")]
    Controller(#[from] ControllerError),
    #[error("controller lock poisoned")]
    ControllerPoisoned,
    #[error("broker {0} is closed")]
    BrokerClosed(String),
}
