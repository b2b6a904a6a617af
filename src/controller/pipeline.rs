//! Pipeline Controller
//!
//! Drives acquisition sessions: live heart rate, bounded HRV collection and
//! cloud analysis. This is the only place that looks at wall-clock time or
//! the input queue; everything below it is a pure function of the samples.

use crate::{
    api::{
        peripherals::{AnalogInput, Display, InputEvents},
        services::{Broker, CloudAnalysis, HistoryStore},
    },
    components::session::Session,
    core::{
        config::MonitorConfig,
        constants::{DISPLAY_WIDTH, PLOT_HEIGHT, PLOT_TOP},
        events::SessionState,
    },
    math::intervals::IntervalCalculator,
    model::{
        cloud::{CloudRequest, CloudResult},
        detector::DetectorMode,
        history::HistoryRecord,
        hrv::{HrvReport, HrvStatistics},
        queue::Sample,
        waveform::{scale_waveform, PlotArea},
    },
};
use log::{debug, info, warn};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::watch, time::Instant};

/// Terminal result of a session that can be cancelled.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome<T> {
    Completed(T),
    Cancelled,
}

/// Result of handing data to an optional collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Sent,
    Failed(String),
    /// No collaborator configured, or nothing worth sending.
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiveSummary {
    /// Heart rate shown when the session ended.
    pub last_bpm: Option<f64>,
    /// Number of display payload recomputations.
    pub updates: usize,
    pub samples: u64,
    pub overruns: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HrvResult {
    pub report: HrvReport,
    pub published: Delivery,
    pub saved: Delivery,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CloudOutcome {
    Analysed { result: CloudResult, ppi_count: usize },
    /// Fewer intervals than the service needs; nothing was sent.
    InsufficientData(usize),
    Unavailable(String),
    TimedOut,
    Cancelled,
}

/// Snapshot published to progress observers after every poll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionProgress {
    pub state: SessionState,
    pub elapsed: Duration,
    pub samples: u64,
    pub peaks: usize,
    pub overruns: u64,
    /// Unread samples in the queue.
    pub buffered: usize,
    pub last_bpm: Option<f64>,
}

/// Periodic deadline on the session clock.
///
/// After a late poll the next deadline counts from the time the work actually
/// ran, so a stall never causes a burst of catch-up runs.
#[derive(Clone, Copy, Debug)]
struct Cadence {
    period: Duration,
    next: Duration,
}

impl Cadence {
    fn new(period: Duration, first: Duration) -> Self {
        Self {
            period,
            next: first,
        }
    }

    fn due(&mut self, elapsed: Duration) -> bool {
        if elapsed < self.next {
            return false;
        }
        self.next = elapsed + self.period;
        true
    }
}

pub struct PipelineController<A: AnalogInput + 'static> {
    config: MonitorConfig,
    input: Arc<Mutex<A>>,
    display: Box<dyn Display>,
    events: Box<dyn InputEvents>,
    broker: Option<Arc<dyn Broker>>,
    cloud: Option<Arc<dyn CloudAnalysis>>,
    history: Option<Arc<dyn HistoryStore>>,
    calculator: IntervalCalculator,
    state: SessionState,
    progress: watch::Sender<SessionProgress>,
}

impl<A: AnalogInput + 'static> PipelineController<A> {
    pub fn new(
        config: MonitorConfig,
        input: Arc<Mutex<A>>,
        display: Box<dyn Display>,
        events: Box<dyn InputEvents>,
    ) -> Self {
        let calculator = IntervalCalculator::new(config.sample_rate, config.hr_band, config.ppi_band);
        let (progress, _) = watch::channel(SessionProgress::default());
        Self {
            config,
            input,
            display,
            events,
            broker: None,
            cloud: None,
            history: None,
            calculator,
            state: SessionState::Idle,
            progress,
        }
    }

    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_cloud(mut self, cloud: Arc<dyn CloudAnalysis>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<SessionProgress> {
        self.progress.subscribe()
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.can_transition_to(next) {
            debug!("session {:?} -> {:?}", self.state, next);
        } else {
            warn!("unexpected session transition {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        self.progress.send_modify(|p| p.state = next);
    }

    fn begin(&mut self, mode: DetectorMode) -> Session {
        self.transition(SessionState::Sampling);
        self.progress.send_replace(SessionProgress {
            state: SessionState::Sampling,
            ..Default::default()
        });
        Session::start(self.input.clone(), &self.config, mode)
    }

    fn report_progress(&self, session: &Session, samples: u64, peaks: usize, last_bpm: Option<f64>) {
        self.progress.send_replace(SessionProgress {
            state: self.state,
            elapsed: session.elapsed(),
            samples,
            peaks,
            overruns: session.overruns(),
            buffered: session.available(),
            last_bpm,
        });
    }

    fn show_lines(&mut self, lines: &[String]) {
        self.display.clear();
        for (row, text) in lines.iter().enumerate() {
            self.display.text(text, 0, row as i32 * 10);
        }
        self.display.show();
    }

    /// Live heart rate until a stop request. Stopping completes the session.
    pub async fn measure_hr(&mut self) -> LiveSummary {
        let mut session = self.begin(DetectorMode::Live);
        let capacity = self.config.live_buffer_len;
        let chunk = self.config.live_chunk_len;
        let mut update = Cadence::new(self.config.live_update(), self.config.live_update());
        let mut refresh = Cadence::new(self.config.display_refresh(), Duration::ZERO);
        let mut buffer: VecDeque<Sample> = VecDeque::with_capacity(capacity + chunk);
        let mut last_bpm = None;
        let mut updates = 0;
        let mut samples = 0u64;
        info!("live heart rate started");

        loop {
            if self.events.stop_requested() {
                break;
            }
            while let Some(pulled) = session.pull(chunk) {
                samples += pulled.len() as u64;
                buffer.extend(pulled);
                let excess = buffer.len().saturating_sub(capacity);
                buffer.drain(..excess);
            }
            session.check_overruns();

            let elapsed = session.elapsed();
            if update.due(elapsed) {
                if buffer.len() >= capacity {
                    let peaks = session.detect(buffer.make_contiguous());
                    let ppi = self.calculator.ppi(&peaks);
                    last_bpm = self.calculator.latest_valid_hr(&ppi);
                    updates += 1;
                    debug!("live update: {} peaks, hr {:?}", peaks.len(), last_bpm);
                }
            }
            if refresh.due(elapsed) {
                self.draw_live(buffer.make_contiguous(), last_bpm);
            }
            self.report_progress(&session, samples, session.peaks().len(), last_bpm);
            tokio::time::sleep(self.config.poll_interval()).await;
        }

        session.stop();
        self.transition(SessionState::Completed);
        let summary = LiveSummary {
            last_bpm,
            updates,
            samples,
            overruns: session.check_overruns(),
        };
        info!("live heart rate stopped: {:?}", summary);
        summary
    }

    fn draw_live(&mut self, buffer: &[Sample], bpm: Option<f64>) {
        let label = match bpm {
            Some(bpm) => format!("HR: {:.0} BPM", bpm),
            None => "HR: --".to_string(),
        };
        let area = PlotArea {
            columns: DISPLAY_WIDTH,
            height: PLOT_HEIGHT,
            top: PLOT_TOP,
        };
        let rows = scale_waveform(buffer, area);
        self.display.clear();
        self.display.text(&label, 0, 0);
        for (x, pair) in rows.windows(2).enumerate() {
            let x = x as i32;
            self.display.line((x, pair[0]), (x + 1, pair[1]));
        }
        self.display.show();
    }

    /// Collects beats for `duration`, returning them unless the user cancelled.
    async fn collect_peaks(
        &mut self,
        duration: Duration,
        title: &str,
    ) -> SessionOutcome<(Vec<u64>, u64, u64)> {
        let mut session = self.begin(DetectorMode::Hrv);
        let mut refresh = Cadence::new(self.config.display_refresh(), Duration::ZERO);
        info!("{} started for {:.0} s", title, duration.as_secs_f64());

        loop {
            if self.events.stop_requested() {
                session.stop();
                self.transition(SessionState::Cancelled);
                info!("{} cancelled", title);
                return SessionOutcome::Cancelled;
            }
            let elapsed = session.elapsed();
            if elapsed >= duration {
                break;
            }
            while session.process_next_window().is_some() {}
            session.check_overruns();
            if refresh.due(elapsed) {
                let remaining = (duration - elapsed).as_secs_f64().ceil();
                self.show_lines(&["Collecting...".to_string(), format!("{:.0}s", remaining)]);
            }
            let samples = session.samples_consumed();
            self.report_progress(&session, samples, session.peaks().len(), None);
            tokio::time::sleep(self.config.poll_interval()).await;
        }

        session.stop();
        // Full windows buffered before the timer stopped still count.
        while session.process_next_window().is_some() {}
        let overruns = session.check_overruns();
        let samples = session.samples_consumed();
        self.report_progress(&session, samples, session.peaks().len(), None);
        self.transition(SessionState::Completed);
        SessionOutcome::Completed((session.take_peaks(), samples, overruns))
    }

    /// Bounded HRV session. On completion the statistics are shown, published
    /// and saved; a cancelled session touches no collaborator.
    pub async fn analyze_hrv(&mut self) -> SessionOutcome<HrvResult> {
        let duration = self.config.hrv_duration();
        let (peaks, samples, overruns) = match self.collect_peaks(duration, "HRV analysis").await {
            SessionOutcome::Completed(collected) => collected,
            SessionOutcome::Cancelled => {
                self.show_lines(&["HRV Cancelled".to_string()]);
                return SessionOutcome::Cancelled;
            }
        };

        let all_ppi = self.calculator.ppi(&peaks);
        let ppi = self.calculator.filter_hrv(&all_ppi);
        let rejected = all_ppi.len() - ppi.len();
        let stats = HrvStatistics::from_ppi(&ppi);
        info!(
            "HRV: {} peaks, {} intervals ({} rejected), mean hr {:.1}, rmssd {:.1} ms, sdnn {:.1} ms",
            peaks.len(),
            ppi.len(),
            rejected,
            stats.mean_hr,
            stats.rmssd * 1000.0,
            stats.sdnn * 1000.0
        );
        self.show_hrv_results(&stats);

        let (published, saved) = if stats.has_sufficient_data() {
            (self.publish(&stats).await, self.save(&stats).await)
        } else {
            warn!("not enough valid intervals, results are not published");
            (Delivery::Skipped, Delivery::Skipped)
        };

        SessionOutcome::Completed(HrvResult {
            report: HrvReport {
                peaks,
                ppi,
                rejected,
                stats,
                samples,
                overruns,
            },
            published,
            saved,
        })
    }

    fn show_hrv_results(&mut self, stats: &HrvStatistics) {
        if !stats.has_sufficient_data() {
            self.show_lines(&["Not enough data".to_string()]);
            return;
        }
        self.show_lines(&[
            format!("PPI: {:.1} ms", stats.mean_ppi * 1000.0),
            format!("HR: {:.1} bpm", stats.mean_hr),
            format!("RMSSD: {:.1} ms", stats.rmssd * 1000.0),
            format!("SDNN: {:.1} ms", stats.sdnn * 1000.0),
        ]);
    }

    async fn publish(&self, stats: &HrvStatistics) -> Delivery {
        let Some(broker) = &self.broker else {
            return Delivery::Skipped;
        };
        let payload = match serde_json::to_string(&stats.to_broker_payload()) {
            Ok(payload) => payload,
            Err(e) => return Delivery::Failed(e.to_string()),
        };
        match broker.publish(&self.config.hrv_topic, payload).await {
            Ok(()) => {
                debug!("results published to {}", self.config.hrv_topic);
                Delivery::Sent
            }
            Err(e) => {
                warn!("publishing results failed: {}", e);
                Delivery::Failed(e.to_string())
            }
        }
    }

    async fn save(&self, stats: &HrvStatistics) -> Delivery {
        let Some(history) = &self.history else {
            return Delivery::Skipped;
        };
        let saved = match HistoryRecord::now(stats) {
            Ok(record) => history.append(record).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!("saving results failed: {}", e);
                Delivery::Failed(e.to_string())
            }
        }
    }

    /// Collects unfiltered intervals and hands them to the cloud service. Both
    /// the collection and the wait for the answer can be cancelled.
    pub async fn cloud_analysis(&mut self) -> CloudOutcome {
        let duration = self.config.cloud_duration();
        let peaks = match self.collect_peaks(duration, "cloud collection").await {
            SessionOutcome::Completed((peaks, _, _)) => peaks,
            SessionOutcome::Cancelled => {
                self.show_lines(&["Cancelled".to_string()]);
                return CloudOutcome::Cancelled;
            }
        };

        let ppi_ms = self.calculator.ppi_ms(&peaks);
        let outcome = self.request_analysis(ppi_ms).await;
        match &outcome {
            CloudOutcome::Analysed { result, .. } => self.show_lines(&[
                format!("SNS: {:.2}", result.sns_index),
                format!("PNS: {:.2}", result.pns_index),
            ]),
            CloudOutcome::InsufficientData(_) => self.show_lines(&["Not enough data".to_string()]),
            CloudOutcome::Unavailable(_) => self.show_lines(&["Cloud unavailable".to_string()]),
            CloudOutcome::TimedOut => self.show_lines(&["No response".to_string()]),
            CloudOutcome::Cancelled => self.show_lines(&["Cancelled".to_string()]),
        }
        info!("cloud analysis: {:?}", outcome);
        outcome
    }

    async fn request_analysis(&mut self, ppi_ms: Vec<u32>) -> CloudOutcome {
        let ppi_count = ppi_ms.len();
        if ppi_count < self.config.min_cloud_ppi {
            warn!(
                "only {} intervals collected, {} needed for cloud analysis",
                ppi_count, self.config.min_cloud_ppi
            );
            return CloudOutcome::InsufficientData(ppi_count);
        }
        let Some(cloud) = self.cloud.clone() else {
            return CloudOutcome::Unavailable("no cloud service configured".to_string());
        };
        let request = CloudRequest::rri(
            self.config.cloud_request_id,
            ppi_ms,
            &self.config.cloud_analysis_type,
        );
        let mut pending = match cloud.submit(request).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("cloud request failed: {}", e);
                return CloudOutcome::Unavailable(e.to_string());
            }
        };

        self.show_lines(&["Waiting for".to_string(), "analysis...".to_string()]);
        let timeout = self.config.cloud_timeout();
        let waiting = Instant::now();
        loop {
            if let Some(answer) = pending.try_take() {
                return match answer {
                    Ok(result) => CloudOutcome::Analysed { result, ppi_count },
                    Err(e) => {
                        warn!("cloud analysis failed: {}", e);
                        CloudOutcome::Unavailable(e.to_string())
                    }
                };
            }
            if self.events.stop_requested() {
                return CloudOutcome::Cancelled;
            }
            if timeout.is_some_and(|t| waiting.elapsed() >= t) {
                warn!("no answer from the cloud service");
                return CloudOutcome::TimedOut;
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }
}
