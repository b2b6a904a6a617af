//! Acquisition Session
//!
//! Owns everything one acquisition run needs: a fresh sample queue, the
//! producer task feeding it and the detector state. Dropping the session stops
//! the producer; nothing survives into the next run.

use super::sampler::SampleSource;
use crate::{
    api::peripherals::AnalogInput,
    core::config::MonitorConfig,
    model::{
        detector::{DetectorMode, PeakDetector},
        queue::{BoundedSampleQueue, Sample},
    },
};
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use tokio::{task::JoinHandle, time::Instant};

#[derive(Debug)]
pub struct Session {
    queue: Arc<BoundedSampleQueue>,
    detector: PeakDetector,
    producer: Option<JoinHandle<()>>,
    started: Instant,
    window_size: usize,
    reported_overruns: u64,
    /// Overruns already passed to the detector as skipped samples.
    skipped: u64,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Session {
    /// Creates the queue and detector and starts the sampling timer.
    pub fn start<A: AnalogInput + 'static>(
        input: Arc<Mutex<A>>,
        config: &MonitorConfig,
        mode: DetectorMode,
    ) -> Self {
        let queue = Arc::new(BoundedSampleQueue::new(config.queue_capacity));
        let threshold = match mode {
            DetectorMode::Live => config.live_threshold,
            DetectorMode::Hrv => config.hrv_threshold,
        };
        let detector = PeakDetector::new(threshold, config.min_peak_distance());
        let producer = SampleSource::new(input, queue.clone(), config.sample_period()).spawn();
        debug!(
            "session started: {:?} mode, {} Hz, queue of {}",
            mode, config.sample_rate, config.queue_capacity
        );
        Self {
            queue,
            detector,
            producer: Some(producer),
            started: Instant::now(),
            window_size: config.window_size,
            reported_overruns: 0,
            skipped: 0,
        }
    }

    /// Stops the sampling timer. Samples already queued stay readable.
    pub fn stop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
            debug!(
                "session stopped after {:.1} s, {} samples consumed",
                self.started.elapsed().as_secs_f64(),
                self.detector.samples_consumed()
            );
        }
    }

    #[cfg(test)]
    pub fn is_sampling(&self) -> bool {
        self.producer.is_some()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Unread samples in the queue.
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Runs the detector over the next full window, if one is buffered.
    ///
    /// Returns the beats accepted in that window. Samples overwritten before
    /// the window still advance the global index, so peak indices stay equal
    /// to stream positions.
    pub fn process_next_window(&mut self) -> Option<Vec<u64>> {
        let overruns = self.queue.overruns();
        let window = self.queue.pull_window(self.window_size)?;
        self.detector.skip(overruns - self.skipped);
        self.skipped = overruns;
        Some(self.detector.process_window(&window))
    }

    /// Scans a standalone buffer from scratch; indices are relative to the buffer.
    pub fn detect(&mut self, buffer: &[Sample]) -> Vec<u64> {
        self.detector.detect(buffer)
    }

    /// Removes exactly `n` raw samples, if that many are buffered.
    pub fn pull(&mut self, n: usize) -> Option<Vec<Sample>> {
        self.queue.pull_window(n)
    }

    /// Current overrun count; logs a warning whenever it has grown.
    pub fn check_overruns(&mut self) -> u64 {
        let overruns = self.queue.overruns();
        if overruns > self.reported_overruns {
            warn!(
                "sample queue overrun: {} samples lost ({} in total)",
                overruns - self.reported_overruns,
                overruns
            );
            self.reported_overruns = overruns;
        }
        overruns
    }

    pub fn overruns(&self) -> u64 {
        self.queue.overruns()
    }

    pub fn peaks(&self) -> &[u64] {
        self.detector.peaks()
    }

    pub fn take_peaks(&mut self) -> Vec<u64> {
        self.detector.take_peaks()
    }

    pub fn samples_consumed(&self) -> u64 {
        self.detector.samples_consumed()
    }
}
