use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::transport::TransportError;

/// Subscriber callback, invoked on the broker's delivery thread with the raw
/// message text.
pub type Handler = Box<dyn FnMut(&str) -> Result<(), String> + Send>;

enum BrokerCommand {
    Subscribe { topic: String, handler: Handler },
    Publish { topic: String, payload: String },
}

#[derive(Default)]
struct Counters {
    acknowledged: AtomicU64,
    failed: AtomicU64,
}

/// In-process publish/subscribe broker. Messages are handed to a dedicated
/// delivery thread, so subscribers run outside the publisher's control flow.
pub struct LocalBroker {
    endpoint: String,
    tx: Option<mpsc::Sender<BrokerCommand>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
    published: u64,
}

impl LocalBroker {
    pub fn new(endpoint: &str) -> Self {
        Self::with_latency(endpoint, Duration::ZERO)
    }

    /// A broker that holds every message for `latency` before delivering it.
    pub fn with_latency(endpoint: &str, latency: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let counters = Arc::new(Counters::default());
        let worker_counters = counters.clone();
        let name = endpoint.to_string();

        let worker = thread::spawn(move || deliver_loop(rx, worker_counters, latency, name));
        log::info!("Broker {} started", endpoint);

        Self {
            endpoint: endpoint.to_string(),
            tx: Some(tx),
            worker: Some(worker),
            counters,
            published: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn subscribe(&self, topic: &str, handler: Handler) -> Result<(), TransportError> {
        self.send(BrokerCommand::Subscribe {
            topic: topic.to_string(),
            handler,
        })
    }

    pub fn publish(&mut self, topic: &str, payload: String) -> Result<(), TransportError> {
        self.send(BrokerCommand::Publish {
            topic: topic.to_string(),
            payload,
        })?;
        self.published += 1;
        Ok(())
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    /// Messages whose subscribers have returned, successfully or not.
    pub fn acknowledged(&self) -> u64 {
        self.counters.acknowledged.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> u64 {
        self.published.saturating_sub(self.acknowledged())
    }

    /// Poll until every published message is acknowledged or `timeout` passes.
    #[cfg(test)]
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.pending() > 0 {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn send(&self, command: BrokerCommand) -> Result<(), TransportError> {
        self.tx
            .as_ref()
            .ok_or_else(|| TransportError::BrokerClosed(self.endpoint.clone()))?
            .send(command)
            .map_err(|_| TransportError::BrokerClosed(self.endpoint.clone()))
    }
}

impl Drop for LocalBroker {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn deliver_loop(
    rx: mpsc::Receiver<BrokerCommand>,
    counters: Arc<Counters>,
    latency: Duration,
    endpoint: String,
) {
    let mut subscriptions: HashMap<String, Vec<Handler>> = HashMap::new();

    while let Ok(command) = rx.recv() {
        match command {
            BrokerCommand::Subscribe { topic, handler } => {
                log::debug!("Broker {}: subscribed to {}", endpoint, topic);
                subscriptions.entry(topic).or_default().push(handler);
            }
            BrokerCommand::Publish { topic, payload } => {
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                match subscriptions.get_mut(&topic) {
                    Some(handlers) => {
                        for handler in handlers.iter_mut() {
                            if let Err(e) = handler(payload.as_str()) {
                                counters.failed.fetch_add(1, Ordering::SeqCst);
                                log::error!(
                                    "Broker {}: handler for {} failed: {}",
                                    endpoint,
                                    topic,
                                    e
                                );
                            }
                        }
                    }
                    None => log::debug!("Broker {}: no subscriber for {}", endpoint, topic),
                }
                counters.acknowledged.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn subscribers_receive_in_publish_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let mut broker = LocalBroker::new("test");
        broker
            .subscribe(
                "topic/a",
                Box::new(move |msg: &str| {
                    sink.lock().unwrap().push(msg.to_string());
                    Ok(())
                }),
            )
            .unwrap();

        broker.publish("topic/a", "one".to_string()).unwrap();
        broker.publish("topic/b", "ignored".to_string()).unwrap();
        broker.publish("topic/a", "two".to_string()).unwrap();

        assert!(broker.wait_idle(Duration::from_secs(2)));
        assert_eq!(broker.published(), 3);
        assert_eq!(broker.acknowledged(), 3);
        assert_eq!(*received.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn handler_errors_are_counted() {
        let mut broker = LocalBroker::new("test");
        broker
            .subscribe("t", Box::new(|_: &str| Err("boom".to_string())))
            .unwrap();
        broker.publish("t", "x".to_string()).unwrap();

        assert!(broker.wait_idle(Duration::from_secs(2)));
        assert_eq!(broker.failed(), 1);
    }

    #[test]
    fn slow_broker_leaves_messages_pending() {
        let mut broker = LocalBroker::with_latency("slow", Duration::from_millis(200));
        broker.publish("t", "x".to_string()).unwrap();

        assert!(!broker.wait_idle(Duration::from_millis(10)));
        assert_eq!(broker.pending(), 1);
        assert!(broker.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn drop_drains_queued_messages() {
        let received = Arc::new(Mutex::new(0));
        let sink = received.clone();
        {
            let mut broker = LocalBroker::new("test");
            broker
                .subscribe(
                    "t",
                    Box::new(move |_: &str| {
                        *sink.lock().unwrap() += 1;
                        Ok(())
                    }),
                )
                .unwrap();
            for _ in 0..5 {
                broker.publish("t", String::new()).unwrap();
            }
        }
        assert_eq!(*received.lock().unwrap(), 5);
    }
}
