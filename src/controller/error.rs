use thiserror::Error;

use crate::message::MessageError;
use crate::transport::Channel;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    #[error("no handler for channel {0}")]
    UnsupportedChannel(Channel),
    #[error("object received before tripod configuration")]
    NotConfigured,
}
