use crate::controller::{Controller, SharedController};
use crate::message::Envelope;
use crate::transport::{Channel, DeliveryStats, Transport, TransportError, TransportMode};

/// Calls the controller's handler in-line; delivery and processing are one step.
pub struct DirectTransport<C> {
    controller: SharedController<C>,
    stats: DeliveryStats,
}

impl<C: Controller> DirectTransport<C> {
    pub fn new(controller: SharedController<C>) -> Self {
        Self {
            controller,
            stats: DeliveryStats::default(),
        }
    }
}

impl<C: Controller> Transport for DirectTransport<C> {
    fn mode(&self) -> TransportMode {
        TransportMode::Direct
    }

    fn deliver(&mut self, channel: Channel, envelope: &Envelope) -> Result<(), TransportError> {
        log::debug!("Processing {} msg on {}", envelope.data_payload_type, channel);
        self.stats.published += 1;

        let mut controller = self
            .controller
            .lock()
            .map_err(|_| TransportError::ControllerPoisoned)?;
        match controller.ingest(channel, envelope) {
            Ok(()) => {
                self.stats.acknowledged += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.failed += 1;
                Err(e.into())
            }
        }
    }

    fn stats(&self) -> DeliveryStats {
        self.stats
    }
}
