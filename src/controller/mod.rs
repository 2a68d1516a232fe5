mod error;
mod geodesy;
mod simulated;
mod snapshot;

use std::sync::{Arc, Mutex};

pub use error::ControllerError;
pub use simulated::SimulatedController;
pub use snapshot::ControllerSnapshot;

use crate::message::{
    ConfigPayload, Envelope, ObjectPayload, OrientationPayload, PayloadType,
};
use crate::transport::Channel;

/// A controller shared between the replay loop and a transport's delivery path.
pub type SharedController<C> = Arc<Mutex<C>>;

/// The pointing controller under test, seen from the harness.
pub trait Controller: Send {
    fn on_config(&mut self, config: ConfigPayload) -> Result<(), ControllerError>;

    fn on_orientation(&mut self, orientation: OrientationPayload) -> Result<(), ControllerError>;

    fn on_object(&mut self, object: ObjectPayload) -> Result<(), ControllerError>;

    /// Advance one update interval and recompute the commanded rates.
    fn update_pointing(&mut self);

    fn snapshot(&self) -> ControllerSnapshot;

    /// Decode an envelope and route it to the handler for `channel`.
    fn ingest(&mut self, channel: Channel, envelope: &Envelope) -> Result<(), ControllerError> {
        match channel {
            Channel::Config => self.on_config(envelope.payload(PayloadType::Configuration)?),
            Channel::Orientation => {
                self.on_orientation(envelope.payload(PayloadType::Orientation)?)
            }
            Channel::Object => self.on_object(envelope.payload(PayloadType::SelectedObject)?),
            other => Err(ControllerError::UnsupportedChannel(other)),
        }
    }
}

pub fn shared<C: Controller>(controller: C) -> SharedController<C> {
    Arc::new(Mutex::new(controller))
}
