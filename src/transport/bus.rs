use std::thread;
use std::time::Duration;

use crate::config::ChannelConfig;
use crate::controller::{Controller, SharedController};
use crate::message::Envelope;
use crate::transport::{
    Channel, DeliveryStats, LocalBroker, Transport, TransportError, TransportMode,
};

/// Publishes serialized envelopes through a broker and waits a fixed settle
/// interval instead of an acknowledgment.
///
/// The settle interval is an approximation: a slow subscriber can still be
/// processing a message when the next tick reads the controller. Shortfalls
/// are logged as delivery timeouts and counted in [`DeliveryStats::late`],
/// but the run continues.
pub struct BusTransport {
    broker: LocalBroker,
    channels: ChannelConfig,
    settle: Duration,
    late: u64,
}

impl BusTransport {
    pub fn new(broker: LocalBroker, channels: ChannelConfig, settle: Duration) -> Self {
        Self {
            broker,
            channels,
            settle,
            late: 0,
        }
    }

    /// Start a broker at `endpoint` and subscribe the controller's
    /// configuration, orientation and object handlers.
    pub fn connect<C: Controller + 'static>(
        endpoint: &str,
        channels: ChannelConfig,
        settle: Duration,
        controller: SharedController<C>,
    ) -> Result<Self, TransportError> {
        let transport = Self::new(LocalBroker::new(endpoint), channels, settle);
        transport.subscribe_controller(controller)?;
        log::info!(
            "Bus transport on {} (settle {:?})",
            transport.broker.endpoint(),
            transport.settle
        );
        Ok(transport)
    }

    pub fn subscribe_controller<C: Controller + 'static>(
        &self,
        controller: SharedController<C>,
    ) -> Result<(), TransportError> {
        for channel in [Channel::Config, Channel::Orientation, Channel::Object] {
            let controller = controller.clone();
            self.broker.subscribe(
                self.channels.topic(channel),
                Box::new(move |json: &str| -> Result<(), String> {
                    let envelope = Envelope::from_json(json).map_err(|e| e.to_string())?;
                    let mut guard = controller
                        .lock()
                        .map_err(|_| "controller lock poisoned".to_string())?;
                    guard.ingest(channel, &envelope).map_err(|e| e.to_string())
                }),
            )?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn broker(&self) -> &LocalBroker {
        &self.broker
    }
}

impl Transport for BusTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Bus
    }

    fn deliver(&mut self, channel: Channel, envelope: &Envelope) -> Result<(), TransportError> {
        let topic = self.channels.topic(channel).to_string();
        let json = envelope.to_json()?;
        log::info!("Publishing {} msg on {}", envelope.data_payload_type, topic);

        self.broker.publish(&topic, json)?;
        thread::sleep(self.settle);

        let pending = self.broker.pending();
        if pending > 0 {
            self.late += 1;
            log::warn!(
                "Delivery timeout on {}: {} message(s) not acknowledged after {:?}",
                topic,
                pending,
                self.settle
            );
        }
        Ok(())
    }

    fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            published: self.broker.published(),
            acknowledged: self.broker.acknowledged(),
            failed: self.broker.failed(),
            late: self.late,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerSettings;
    use crate::controller::{shared, SimulatedController};
    use crate::message::{ConfigPayload, MessageFactory, OrientationPayload};
    use crate::track::TrajectorySample;

    fn channels() -> ChannelConfig {
        ChannelConfig {
            config: "config".to_string(),
            orientation: "orientation".to_string(),
            object: "object".to_string(),
            capture: "capture".to_string(),
            logger: "logger".to_string(),
            image_filename: "image".to_string(),
        }
    }

    fn factory() -> MessageFactory {
        MessageFactory::new(
            ConfigPayload {
                tripod_longitude: -77.0,
                tripod_latitude: 38.0,
                tripod_altitude: 86.46,
            },
            OrientationPayload::zero(),
            "TBC".to_string(),
        )
    }

    fn sample() -> TrajectorySample {
        TrajectorySample::new(50.0, 38.05, -77.0, 3000.0, 150.0, 0.0).with_heading(90.0)
    }

    #[test]
    fn published_envelopes_reach_the_controller() {
        let controller = shared(SimulatedController::new(ControllerSettings::default()));
        let mut transport = BusTransport::connect(
            "localhost",
            channels(),
            Duration::from_millis(5),
            controller.clone(),
        )
        .unwrap();
        let factory = factory();

        transport
            .deliver(Channel::Config, &factory.config_envelope().unwrap())
            .unwrap();
        transport
            .deliver(Channel::Object, &factory.object_envelope(&sample()).unwrap())
            .unwrap();
        assert!(transport.broker().wait_idle(Duration::from_secs(2)));

        let guard = controller.lock().unwrap();
        assert_eq!(guard.camera_time(), 50.0);
        assert!(guard.snapshot().tau_o > 0.0);
        drop(guard);

        let stats = transport.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.acknowledged, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(transport.mode(), TransportMode::Bus);
    }

    #[test]
    fn slow_broker_is_reported_late() {
        let controller = shared(SimulatedController::new(ControllerSettings::default()));
        let broker = LocalBroker::with_latency("slow", Duration::from_millis(200));
        let mut transport = BusTransport::new(broker, channels(), Duration::from_millis(1));
        transport.subscribe_controller(controller).unwrap();

        transport
            .deliver(Channel::Config, &factory().config_envelope().unwrap())
            .unwrap();
        assert_eq!(transport.stats().late, 1);
        assert!(transport.broker().wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn subscriber_failures_do_not_fail_delivery() {
        let controller = shared(SimulatedController::new(ControllerSettings::default()));
        let mut transport =
            BusTransport::connect("localhost", channels(), Duration::from_millis(5), controller)
                .unwrap();

        // Object before configuration is rejected on the broker thread.
        transport
            .deliver(Channel::Object, &factory().object_envelope(&sample()).unwrap())
            .unwrap();
        assert!(transport.broker().wait_idle(Duration::from_secs(2)));
        assert_eq!(transport.stats().failed, 1);
    }
}
