//! Service Traits
//!
//! Asynchronous collaborators outside the acquisition core: the message
//! broker, the cloud analysis service and the result history.

use crate::model::{
    cloud::{CloudRequest, CloudResult},
    history::HistoryRecord,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::{broadcast, oneshot};

/// A message delivered by the broker.
#[derive(Clone, Debug, PartialEq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: String,
}

/// Receives messages of a single topic.
#[derive(Debug)]
pub struct BrokerSubscription {
    topic: String,
    rx: broadcast::Receiver<BrokerMessage>,
}

impl BrokerSubscription {
    pub fn new(topic: &str, rx: broadcast::Receiver<BrokerMessage>) -> Self {
        Self {
            topic: topic.to_string(),
            rx,
        }
    }

    /// Waits for the next payload on the subscribed topic.
    pub async fn next(&mut self) -> Result<String> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if msg.topic == self.topic => return Ok(msg.payload),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("subscription to {} skipped {} messages", self.topic, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(anyhow!("broker closed subscription to {}", self.topic))
                }
            }
        }
    }
}

/// Publish/subscribe message broker. Publishing is fire-and-forget.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
    fn subscribe(&self, topic: &str) -> Result<BrokerSubscription>;
}

/// The single outstanding cloud request.
#[derive(Debug)]
pub struct PendingAnalysis {
    rx: oneshot::Receiver<Result<CloudResult>>,
}

impl PendingAnalysis {
    pub fn new(rx: oneshot::Receiver<Result<CloudResult>>) -> Self {
        Self { rx }
    }

    /// An already answered request.
    pub fn ready(result: Result<CloudResult>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Non-blocking check for the answer; `None` while it is still outstanding.
    pub fn try_take(&mut self) -> Option<Result<CloudResult>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(anyhow!("cloud request was dropped before an answer arrived")))
            }
        }
    }
}

/// Remote HRV analysis. Only one request is in flight at a time; submitting a
/// new request abandons the previous one.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CloudAnalysis: Send + Sync {
    async fn submit(&self, request: CloudRequest) -> Result<PendingAnalysis>;
}

/// Append-only store of finished HRV results.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<()>;
    /// Stored records, newest first.
    async fn records(&self) -> Result<Vec<HistoryRecord>>;
}
