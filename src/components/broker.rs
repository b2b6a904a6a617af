//! In-Process Broker
//!
//! Topic-based publish/subscribe on top of a tokio broadcast channel. Used when
//! no network broker is configured and by the cloud client as its transport.

use crate::api::services::{Broker, BrokerMessage, BrokerSubscription};
use anyhow::Result;
use async_trait::async_trait;
use log::trace;
use tokio::sync::broadcast::{self, Sender};

#[derive(Debug, Clone)]
pub struct LocalBroker {
    bus: Sender<BrokerMessage>,
}

impl LocalBroker {
    pub fn new(capacity: usize) -> Self {
        let (bus, _) = broadcast::channel(capacity);
        Self { bus }
    }
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Broker for LocalBroker {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        trace!("publish {}: {}", topic, payload);
        // Fire-and-forget: a message nobody listens to is not an error.
        let _ = self.bus.send(BrokerMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<BrokerSubscription> {
        Ok(BrokerSubscription::new(topic, self.bus.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_topic() {
        let broker = LocalBroker::default();
        let mut sub = broker.subscribe("hrv").unwrap();
        broker.publish("other", "x".to_string()).await.unwrap();
        broker.publish("hrv", "y".to_string()).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), "y");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = LocalBroker::default();
        assert!(broker.publish("hrv", "{}".to_string()).await.is_ok());
    }
}
