//! Application Controller
//!
//! Wires the concrete collaborators together and runs one operating mode to
//! completion.

use super::pipeline::{CloudOutcome, Delivery, PipelineController, SessionOutcome, SessionProgress};
use crate::{
    api::services::HistoryStore,
    components::{
        broker::LocalBroker,
        cloud::BrokerCloudClient,
        console::ConsoleDisplay,
        input::{spawn_ctrl_c_handler, spawn_stdin_reader, ChannelInput},
        simulator::SyntheticPpg,
        storage::JsonHistory,
    },
    core::config::MonitorConfig,
};
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use tokio::{sync::watch, task::JoinHandle};

/// What the device is asked to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    MeasureHr,
    AnalyzeHrv,
    Kubios,
    History,
}

/// Parameters of the synthetic analog front end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontEnd {
    pub bpm: f64,
    pub jitter_ms: f64,
    pub noise: i32,
    pub seed: u64,
}

impl FrontEnd {
    fn build(&self, sample_rate: f64) -> SyntheticPpg {
        SyntheticPpg::new(sample_rate, self.bpm)
            .with_jitter(self.jitter_ms)
            .with_noise(self.noise)
            .with_seed(self.seed)
    }
}

pub struct AppController {
    config: MonitorConfig,
    front_end: FrontEnd,
    broker: Arc<LocalBroker>,
    history: Arc<JsonHistory>,
}

impl AppController {
    pub fn new(config: MonitorConfig, front_end: FrontEnd) -> Self {
        info!("Initializing AppController.");
        let history = Arc::new(JsonHistory::new(
            config.history_file.clone(),
            config.history_limit,
        ));
        Self {
            config,
            front_end,
            broker: Arc::new(LocalBroker::default()),
            history,
        }
    }

    pub async fn run(&self, mode: Mode) -> Result<()> {
        if mode == Mode::History {
            return self.print_history().await;
        }

        let (tx, events) = ChannelInput::channel();
        let tasks = [spawn_stdin_reader(tx.clone()), spawn_ctrl_c_handler(tx)];
        let input = Arc::new(Mutex::new(self.front_end.build(self.config.sample_rate)));
        let cloud = BrokerCloudClient::new(
            self.broker.clone(),
            &self.config.cloud_request_topic,
            &self.config.cloud_response_topic,
        );
        let mut pipeline = PipelineController::new(
            self.config.clone(),
            input,
            Box::new(ConsoleDisplay::stdout()),
            Box::new(events),
        )
        .with_broker(self.broker.clone())
        .with_cloud(Arc::new(cloud))
        .with_history(self.history.clone());
        let observer = spawn_progress_logger(pipeline.subscribe_progress());

        match mode {
            Mode::MeasureHr => {
                println!("Measuring heart rate, enter q to stop.");
                let summary = pipeline.measure_hr().await;
                if summary.overruns > 0 {
                    warn!("{} samples were lost during the session", summary.overruns);
                }
            }
            Mode::AnalyzeHrv => {
                println!("Collecting HRV data, enter q to cancel.");
                match pipeline.analyze_hrv().await {
                    SessionOutcome::Completed(result) => {
                        report_delivery("broker", &result.published);
                        report_delivery("history", &result.saved);
                    }
                    SessionOutcome::Cancelled => info!("HRV session cancelled"),
                }
            }
            Mode::Kubios => {
                println!("Collecting intervals for cloud analysis, enter q to cancel.");
                if let CloudOutcome::Analysed { result, ppi_count } = pipeline.cloud_analysis().await {
                    info!(
                        "{} intervals analysed: sns {:.2}, pns {:.2}",
                        ppi_count, result.sns_index, result.pns_index
                    );
                }
            }
            Mode::History => {}
        }

        observer.abort();
        for task in tasks {
            task.abort();
        }
        Ok(())
    }

    async fn print_history(&self) -> Result<()> {
        let records = self.history.records().await?;
        if records.is_empty() {
            println!("No history");
        }
        for (i, record) in records.iter().enumerate() {
            println!(
                "{}. {}  HR {:.1} bpm  PPI {:.1} ms  RMSSD {:.1} ms  SDNN {:.1} ms",
                i + 1,
                record.timestamp,
                record.mean_hr,
                record.mean_ppi * 1000.0,
                record.rmssd * 1000.0,
                record.sdnn * 1000.0
            );
        }
        Ok(())
    }
}

fn report_delivery(target: &str, delivery: &Delivery) {
    match delivery {
        Delivery::Sent => info!("results delivered to {}", target),
        Delivery::Failed(e) => warn!("results not delivered to {}: {}", target, e),
        Delivery::Skipped => debug!("nothing delivered to {}", target),
    }
}

/// Logs session progress once per second of session time.
fn spawn_progress_logger(mut rx: watch::Receiver<SessionProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_second = None;
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().clone();
            let second = progress.elapsed.as_secs();
            if progress.state.is_terminal() {
                debug!("session ended: {:?}", progress.state);
                last_second = None;
            } else if last_second != Some(second) {
                last_second = Some(second);
                debug!(
                    "{:?} {} s: {} samples ({} buffered), {} peaks, {} overruns, hr {:?}",
                    progress.state,
                    second,
                    progress.samples,
                    progress.buffered,
                    progress.peaks,
                    progress.overruns,
                    progress.last_bpm
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{history::HistoryRecord, hrv::HrvStatistics};
    use tempdir::TempDir;

    #[tokio::test]
    async fn test_history_mode_reads_store() {
        let dir = TempDir::new("app").unwrap();
        let config = MonitorConfig {
            history_file: dir.path().join("history.json"),
            ..Default::default()
        };
        let front_end = FrontEnd {
            bpm: 60.0,
            jitter_ms: 0.0,
            noise: 0,
            seed: 0,
        };
        let app = AppController::new(config, front_end);
        assert!(app.run(Mode::History).await.is_ok());

        let stats = HrvStatistics::from_ppi(&[1.0, 1.0, 1.0]);
        app.history
            .append(HistoryRecord::new("01.01.2025 12:00".to_string(), &stats))
            .await
            .unwrap();
        assert!(app.run(Mode::History).await.is_ok());
        assert_eq!(app.history.records().await.unwrap().len(), 1);
    }
}
