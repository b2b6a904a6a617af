//! Monitor Configuration
//!
//! All tunables of the acquisition pipeline. Every field has a default matching
//! the reference device, so a configuration file only needs to name what it changes.

use super::constants::*;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Closed interval `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples per second produced by the analog front end.
    pub sample_rate: f64,
    pub queue_capacity: usize,
    pub window_size: usize,
    /// Minimum spacing of accepted beats in seconds.
    pub refractory_s: f64,
    pub live_threshold: f64,
    pub hrv_threshold: f64,
    /// Plausible heart rates for the live screen, bpm.
    pub hr_band: Band,
    /// Plausible pulse intervals for HRV statistics, seconds.
    pub ppi_band: Band,
    pub live_buffer_len: usize,
    pub live_chunk_len: usize,
    pub live_update_s: f64,
    pub hrv_duration_s: f64,
    pub cloud_duration_s: f64,
    pub min_cloud_ppi: usize,
    pub cloud_request_id: u32,
    pub cloud_analysis_type: String,
    /// Give up waiting for the cloud after this many seconds; `None` waits until cancelled.
    pub cloud_timeout_s: Option<f64>,
    pub hrv_topic: String,
    pub cloud_request_topic: String,
    pub cloud_response_topic: String,
    pub poll_interval_ms: u64,
    pub display_refresh_ms: u64,
    pub history_file: PathBuf,
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
            refractory_s: REFRACTORY_PERIOD_S,
            live_threshold: LIVE_THRESHOLD_FACTOR,
            hrv_threshold: HRV_THRESHOLD_FACTOR,
            hr_band: Band::new(MIN_DISPLAY_BPM, MAX_DISPLAY_BPM),
            ppi_band: Band::new(MIN_HRV_PPI_S, MAX_HRV_PPI_S),
            live_buffer_len: LIVE_BUFFER_LEN,
            live_chunk_len: LIVE_CHUNK_LEN,
            live_update_s: 5.0,
            hrv_duration_s: 30.0,
            cloud_duration_s: 30.0,
            min_cloud_ppi: MIN_CLOUD_PPI_COUNT,
            cloud_request_id: CLOUD_REQUEST_ID,
            cloud_analysis_type: "readiness".to_string(),
            cloud_timeout_s: Some(60.0),
            hrv_topic: HRV_TOPIC.to_string(),
            cloud_request_topic: CLOUD_REQUEST_TOPIC.to_string(),
            cloud_response_topic: CLOUD_RESPONSE_TOPIC.to_string(),
            poll_interval_ms: 10,
            display_refresh_ms: 100,
            history_file: PathBuf::from(HISTORY_FILE),
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl MonitorConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("could not read config {}: {}", path.display(), e))?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(anyhow!("sample rate must be positive, got {}", self.sample_rate));
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(anyhow!(
                "sample rate {} exceeds {} Hz",
                self.sample_rate,
                MAX_SAMPLE_RATE
            ));
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue capacity must not be zero"));
        }
        if self.window_size < 3 {
            return Err(anyhow!("window size must be at least 3 samples"));
        }
        if self.window_size > self.queue_capacity {
            return Err(anyhow!(
                "window size {} exceeds queue capacity {}",
                self.window_size,
                self.queue_capacity
            ));
        }
        if self.live_chunk_len == 0 || self.live_chunk_len > self.queue_capacity {
            return Err(anyhow!("live chunk length must be within 1..=queue capacity"));
        }
        if self.live_buffer_len < 3 {
            return Err(anyhow!("live buffer must hold at least 3 samples"));
        }
        for (name, k) in [("live", self.live_threshold), ("hrv", self.hrv_threshold)] {
            if !(0.0..=1.0).contains(&k) {
                return Err(anyhow!("{} threshold factor {} outside [0, 1]", name, k));
            }
        }
        for (name, band) in [("hr", self.hr_band), ("ppi", self.ppi_band)] {
            if band.min > band.max || band.min < 0.0 {
                return Err(anyhow!("{} band [{}, {}] is invalid", name, band.min, band.max));
            }
        }
        let durations = [
            ("refractory", self.refractory_s),
            ("live update", self.live_update_s),
            ("hrv duration", self.hrv_duration_s),
            ("cloud duration", self.cloud_duration_s),
        ];
        let timeout = self.cloud_timeout_s.map(|t| ("cloud timeout", t));
        for (name, value) in durations.into_iter().chain(timeout) {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("{} must be a positive number of seconds", name));
            }
            if value > MAX_DURATION_S {
                return Err(anyhow!("{} of {} s exceeds {} s", name, value, MAX_DURATION_S));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll interval must not be zero"));
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_rate)
    }

    /// Refractory distance in samples, rounded down.
    pub fn min_peak_distance(&self) -> u64 {
        (self.refractory_s * self.sample_rate).floor() as u64
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display_refresh_ms)
    }

    pub fn live_update(&self) -> Duration {
        Duration::from_secs_f64(self.live_update_s)
    }

    pub fn hrv_duration(&self) -> Duration {
        Duration::from_secs_f64(self.hrv_duration_s)
    }

    pub fn cloud_duration(&self) -> Duration {
        Duration::from_secs_f64(self.cloud_duration_s)
    }

    pub fn cloud_timeout(&self) -> Option<Duration> {
        self.cloud_timeout_s.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_peak_distance(), 100);
        assert_eq!(config.sample_period(), Duration::from_millis(4));
    }

    #[test]
    fn test_rejects_non_positive_sample_rate() {
        let config = MonitorConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            sample_rate: -250.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_window_larger_than_queue() {
        let config = MonitorConfig {
            window_size: 600,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"sample_rate": 100.0, "hrv_duration_s": 60.0}"#).unwrap();
        assert_eq!(config.sample_rate, 100.0);
        assert_eq!(config.hrv_duration(), Duration::from_secs(60));
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.min_peak_distance(), 40);
    }

    #[test]
    fn test_rejects_unrepresentable_periods() {
        let config = MonitorConfig {
            sample_rate: 2e9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            hrv_duration_s: 1e30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            cloud_timeout_s: Some(1e30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            cloud_timeout_s: Some(f64::NAN),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            sample_rate: MAX_SAMPLE_RATE,
            cloud_timeout_s: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.sample_period() > Duration::ZERO);
    }

    #[test]
    fn test_band_is_inclusive() {
        let band = Band::new(0.6, 1.2);
        assert!(band.contains(0.6));
        assert!(band.contains(1.2));
        assert!(!band.contains(1.2001));
    }
}
