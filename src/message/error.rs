use thiserror::Error;

use crate::message::PayloadType;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("envelope encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("expected {expected} payload, envelope carries {actual}")]
    WrongPayloadType {
        expected: PayloadType,
        actual: PayloadType,
    },
    #[error("cannot decode {expected} payload: {source}")]
    Payload {
        expected: PayloadType,
        source: serde_json::Error,
    },
}
