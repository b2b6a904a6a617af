//! History Record
//!
//! One stored HRV result. Durations are kept in seconds.

use super::hrv::HrvStatistics;
use crate::core::constants::HISTORY_TIMESTAMP_FORMAT;
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Local wall-clock time formatted as `DD.MM.YYYY HH:MM`.
    pub timestamp: String,
    pub mean_hr: f64,
    pub mean_ppi: f64,
    pub rmssd: f64,
    pub sdnn: f64,
}

impl HistoryRecord {
    pub fn new(timestamp: String, stats: &HrvStatistics) -> Self {
        Self {
            timestamp,
            mean_hr: stats.mean_hr,
            mean_ppi: stats.mean_ppi,
            rmssd: stats.rmssd,
            sdnn: stats.sdnn,
        }
    }

    /// Stamps `stats` with the wall-clock time of `time` in its own offset.
    pub fn at(time: OffsetDateTime, stats: &HrvStatistics) -> Result<Self> {
        Ok(Self::new(time.format(HISTORY_TIMESTAMP_FORMAT)?, stats))
    }

    /// Stamps `stats` with the local time, or UTC when the local offset is unknown.
    pub fn now(stats: &HrvStatistics) -> Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|e| {
            debug!("local offset unavailable ({}), using UTC", e);
            OffsetDateTime::now_utc()
        });
        Self::at(now, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_timestamp_format() {
        let stats = HrvStatistics {
            mean_ppi: 0.8,
            mean_hr: 75.0,
            rmssd: 0.02,
            sdnn: 0.03,
        };
        let record = HistoryRecord::at(datetime!(2024-03-07 09:05:59 UTC), &stats).unwrap();
        assert_eq!(record.timestamp, "07.03.2024 09:05");
        assert_eq!(record.mean_hr, 75.0);
        assert_eq!(record.sdnn, 0.03);
    }

    #[test]
    fn test_timestamp_keeps_local_wall_clock() {
        let stats = HrvStatistics::default();
        let record = HistoryRecord::at(datetime!(2024-03-07 23:30 -2), &stats).unwrap();
        assert_eq!(record.timestamp, "07.03.2024 23:30");

        let record = HistoryRecord::now(&stats).unwrap();
        let bytes = record.timestamp.as_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!((bytes[2], bytes[5], bytes[10], bytes[13]), (b'.', b'.', b' ', b':'));
    }
}
