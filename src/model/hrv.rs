//! HRV Model
//!
//! Summary statistics of one HRV session and the payloads derived from them.

use crate::math::hrv::{calc_mean, calc_rmssd, calc_sdnn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// `HrvStatistics` structure.
///
/// Time-domain HRV summary of a filtered PPI sequence, all durations in seconds.
/// Every field is zero when fewer than two intervals were available.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HrvStatistics {
    /// Mean pulse-to-pulse interval.
    pub mean_ppi: f64,
    /// Mean heart rate in bpm, `60 / mean_ppi`.
    pub mean_hr: f64,
    /// Root Mean Square of Successive Differences.
    pub rmssd: f64,
    /// Population standard deviation of the intervals.
    pub sdnn: f64,
}

impl HrvStatistics {
    /// Computes the statistics of an already filtered PPI sequence.
    pub fn from_ppi(ppi: &[f64]) -> Self {
        if ppi.len() < 2 {
            return Self::default();
        }
        let mean_ppi = calc_mean(ppi);
        let mean_hr = if mean_ppi > 0.0 { 60.0 / mean_ppi } else { 0.0 };
        Self {
            mean_ppi,
            mean_hr,
            rmssd: calc_rmssd(ppi),
            sdnn: calc_sdnn(ppi),
        }
    }

    /// `false` for the all-zero result of a degenerate sequence.
    pub fn has_sufficient_data(&self) -> bool {
        self.mean_ppi > 0.0
    }

    /// Payload published to the broker: milliseconds and bpm, one decimal, as strings.
    pub fn to_broker_payload(&self) -> BrokerPayload {
        BrokerPayload {
            mean_ppi: format!("{:.1}", self.mean_ppi * 1000.0),
            mean_hr: format!("{:.1}", self.mean_hr),
            rmssd: format!("{:.1}", self.rmssd * 1000.0),
            sdnn: format!("{:.1}", self.sdnn * 1000.0),
        }
    }
}

/// JSON body of the local results topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrokerPayload {
    pub mean_ppi: String,
    pub mean_hr: String,
    pub rmssd: String,
    pub sdnn: String,
}

/// Result of a completed HRV session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HrvReport {
    /// Global indices of all accepted beats.
    pub peaks: Vec<u64>,
    /// Intervals inside the HRV band, seconds.
    pub ppi: Vec<f64>,
    /// Intervals dropped by the band filter.
    pub rejected: usize,
    pub stats: HrvStatistics,
    pub samples: u64,
    pub overruns: u64,
}
