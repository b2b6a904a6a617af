//! History Storage
//!
//! Keeps the latest HRV results in a JSON file, newest first.

use crate::{api::services::HistoryStore, model::history::HistoryRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use tokio::{fs, sync::Mutex};

/// `JsonHistory` stores at most `limit` records in a single JSON array.
#[derive(Debug)]
pub struct JsonHistory {
    path: PathBuf,
    limit: usize,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonHistory {
    pub fn new(path: PathBuf, limit: usize) -> Self {
        Self {
            path,
            limit,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<HistoryRecord>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no history at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(anyhow!(e)),
        };
        let records = tokio::task::spawn_blocking(move || {
            let serde_result: Result<Vec<HistoryRecord>, serde_json::Error> =
                serde_json::from_str(json.as_str());
            serde_result
        })
        .await??;
        Ok(records)
    }

    async fn store(&self, records: Vec<HistoryRecord>) -> Result<()> {
        let json = tokio::task::spawn_blocking(move || serde_json::to_string(&records)).await??;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, json).await.map_err(|e| anyhow!(e))
    }
}

#[async_trait]
impl HistoryStore for JsonHistory {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(0, record);
        records.truncate(self.limit);
        self.store(records).await?;
        info!("history entry saved to {}", self.path.display());
        Ok(())
    }

    async fn records(&self) -> Result<Vec<HistoryRecord>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}
