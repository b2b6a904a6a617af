//! Cloud Analysis Client
//!
//! Sends readiness requests over the broker and correlates the answer by
//! keeping exactly one request in flight: the next payload on the response
//! topic after a request was published is its answer.

use crate::{
    api::services::{Broker, CloudAnalysis, PendingAnalysis},
    model::cloud::{CloudRequest, CloudResult},
};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task::JoinHandle};

pub struct BrokerCloudClient<B: Broker + 'static> {
    broker: Arc<B>,
    request_topic: String,
    response_topic: String,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl<B: Broker + 'static> Drop for BrokerCloudClient<B> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.in_flight.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl<B: Broker + 'static> BrokerCloudClient<B> {
    pub fn new(broker: Arc<B>, request_topic: &str, response_topic: &str) -> Self {
        Self {
            broker,
            request_topic: request_topic.to_string(),
            response_topic: response_topic.to_string(),
            in_flight: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<B: Broker + 'static> CloudAnalysis for BrokerCloudClient<B> {
    async fn submit(&self, request: CloudRequest) -> Result<PendingAnalysis> {
        // Subscribe before publishing so a fast answer cannot be missed.
        let mut subscription = self.broker.subscribe(&self.response_topic)?;
        let payload = serde_json::to_string(&request)?;
        self.broker.publish(&self.request_topic, payload).await?;
        info!(
            "cloud request {} sent with {} intervals",
            request.id,
            request.data.len()
        );

        let (tx, rx) = oneshot::channel();
        let waiter = tokio::spawn(async move {
            let result = subscription
                .next()
                .await
                .and_then(|raw| CloudResult::from_response(&raw));
            debug!("cloud response received: {:?}", result);
            let _ = tx.send(result);
        });
        if let Ok(mut slot) = self.in_flight.lock() {
            if let Some(previous) = slot.replace(waiter) {
                previous.abort();
            }
        }
        Ok(PendingAnalysis::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::broker::LocalBroker;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_and_response() {
        let broker = Arc::new(LocalBroker::default());
        let mut requests = broker.subscribe("kubios-request").unwrap();
        let client = BrokerCloudClient::new(broker.clone(), "kubios-request", "kubios-response");

        let mut pending = client
            .submit(CloudRequest::rri(1, vec![800, 810, 790], "readiness"))
            .await
            .unwrap();
        assert!(pending.try_take().is_none());

        let sent: CloudRequest = serde_json::from_str(&requests.next().await.unwrap()).unwrap();
        assert_eq!(sent.data, vec![800, 810, 790]);

        broker
            .publish(
                "kubios-response",
                r#"{"data": {"analysis": {"sns_index": 0.7, "pns_index": 1.1}}}"#.to_string(),
            )
            .await
            .unwrap();

        let result = loop {
            if let Some(result) = pending.try_take() {
                break result.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };
        assert_eq!(result.sns_index, 0.7);
        assert_eq!(result.pns_index, 1.1);
    }

    #[tokio::test]
    async fn test_new_request_abandons_previous() {
        let broker = Arc::new(LocalBroker::default());
        let client = BrokerCloudClient::new(broker.clone(), "req", "resp");
        let mut first = client.submit(CloudRequest::rri(1, vec![], "readiness")).await.unwrap();
        let _second = client.submit(CloudRequest::rri(2, vec![], "readiness")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(first.try_take().unwrap().is_err());
    }
}
