mod envelope;
mod error;
mod factory;
mod payload;

pub use envelope::Envelope;
pub use error::MessageError;
pub use factory::{Clock, MessageFactory};
pub use payload::{ConfigPayload, ObjectPayload, OrientationPayload, PayloadType};
