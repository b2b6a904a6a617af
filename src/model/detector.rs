//! Peak Detector
//!
//! Slope sign-change beat detector with a per-window adaptive threshold and a
//! refractory distance between accepted beats.
//!
//! The detector is a stream processor: it remembers the last sample and slope
//! of the previous window, so a beat whose maximum falls on a window boundary
//! is found exactly once and global indices stay monotonic.

use super::queue::Sample;
use log::trace;

/// Which threshold factor the detector applies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetectorMode {
    /// Responsive setting for the live heart rate screen.
    Live,
    /// Stricter setting used when collecting intervals for HRV statistics.
    Hrv,
}

#[derive(Clone, Debug)]
pub struct PeakDetector {
    threshold_factor: f64,
    min_peak_distance: u64,
    /// Sign and magnitude of the last sample-to-sample delta.
    last_slope: Option<i32>,
    last_sample: Option<Sample>,
    /// Number of samples consumed so far; the global index of the next sample.
    global_index: u64,
    /// `None` until the first beat, which therefore always qualifies.
    last_peak_index: Option<u64>,
    peaks: Vec<u64>,
}

impl PeakDetector {
    pub fn new(threshold_factor: f64, min_peak_distance: u64) -> Self {
        Self {
            threshold_factor,
            min_peak_distance,
            last_slope: None,
            last_sample: None,
            global_index: 0,
            last_peak_index: None,
            peaks: Vec::new(),
        }
    }

    /// Clears all running state for a new session.
    pub fn reset(&mut self) {
        self.last_slope = None;
        self.last_sample = None;
        self.global_index = 0;
        self.last_peak_index = None;
        self.peaks.clear();
    }

    /// `min(window) + k * (max(window) - min(window))`, or `None` for an empty window.
    pub fn threshold(&self, window: &[Sample]) -> Option<f64> {
        let min = *window.iter().min()? as f64;
        let max = *window.iter().max()? as f64;
        Some(min + self.threshold_factor * (max - min))
    }

    /// Scans one window and returns the global indices of the beats accepted in it.
    ///
    /// A candidate is flagged at sample `i` when the slope turns from `>= 0` to
    /// `< 0` and sample `i - 1` lies above the threshold. Windows shorter than
    /// three samples are ignored entirely.
    pub fn process_window(&mut self, window: &[Sample]) -> Vec<u64> {
        if window.len() < 3 {
            return Vec::new();
        }
        let Some(threshold) = self.threshold(window) else {
            return Vec::new();
        };

        let mut accepted = Vec::new();
        for (offset, &current) in window.iter().enumerate() {
            let index = self.global_index + offset as u64;
            if let Some(previous) = self.last_sample {
                let slope = current as i32 - previous as i32;
                let turned_down = matches!(self.last_slope, Some(last) if last >= 0) && slope < 0;
                if turned_down && previous as f64 > threshold && self.outside_refractory(index) {
                    self.last_peak_index = Some(index);
                    self.peaks.push(index);
                    accepted.push(index);
                }
                self.last_slope = Some(slope);
            }
            self.last_sample = Some(current);
        }
        self.global_index += window.len() as u64;

        trace!(
            "window of {} samples, threshold {:.1}, {} new peaks",
            window.len(),
            threshold,
            accepted.len()
        );
        accepted
    }

    /// Accounts for `lost` samples that never reached the detector.
    ///
    /// The global index moves past the gap and the slope state is dropped, so
    /// no candidate is formed across the discontinuity.
    pub fn skip(&mut self, lost: u64) {
        if lost == 0 {
            return;
        }
        self.global_index += lost;
        self.last_sample = None;
        self.last_slope = None;
    }

    /// Runs a fresh scan over a standalone buffer; indices are relative to its start.
    pub fn detect(&mut self, buffer: &[Sample]) -> Vec<u64> {
        self.reset();
        self.process_window(buffer)
    }

    fn outside_refractory(&self, index: u64) -> bool {
        match self.last_peak_index {
            Some(last) => index - last > self.min_peak_distance,
            None => true,
        }
    }

    /// All beats accepted since the last reset.
    pub fn peaks(&self) -> &[u64] {
        &self.peaks
    }

    pub fn take_peaks(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.peaks)
    }

    pub fn samples_consumed(&self) -> u64 {
        self.global_index
    }

    pub fn min_peak_distance(&self) -> u64 {
        self.min_peak_distance
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Gaussian pulses of the given amplitude centred on `peaks`, with uniform noise.
    pub(crate) fn pulse_train(len: usize, peaks: &[usize], noise: i32, seed: u64) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|i| {
                let pulse: f64 = peaks
                    .iter()
                    .map(|&p| {
                        let d = i as f64 - p as f64;
                        20_000.0 * (-d * d / 128.0).exp()
                    })
                    .sum();
                let jitter = if noise > 0 {
                    rng.gen_range(-noise..=noise)
                } else {
                    0
                };
                (30_000.0 + pulse + jitter as f64).round() as Sample
            })
            .collect()
    }

    fn hrv_detector() -> PeakDetector {
        PeakDetector::new(0.85, 100)
    }

    #[test]
    fn test_monotonic_windows_have_no_peaks() {
        let rising: Vec<Sample> = (0..250).map(|i| 1000 + i * 7).collect();
        let falling: Vec<Sample> = rising.iter().rev().copied().collect();
        let mut detector = hrv_detector();
        assert!(detector.process_window(&rising).is_empty());
        detector.reset();
        assert!(detector.process_window(&falling).is_empty());
    }

    #[test]
    fn test_flat_window_has_no_peaks() {
        let mut detector = hrv_detector();
        let flat = vec![32_768; 250];
        assert_eq!(detector.threshold(&flat), Some(32_768.0));
        assert!(detector.process_window(&flat).is_empty());
    }

    #[test]
    fn test_short_window_is_noop() {
        let mut detector = hrv_detector();
        assert!(detector.process_window(&[]).is_empty());
        assert!(detector.process_window(&[1, 5]).is_empty());
        assert_eq!(detector.samples_consumed(), 0);
        assert!(detector.threshold(&[]).is_none());
    }

    #[test]
    fn test_recovers_known_peaks_within_one_sample() {
        for seed in 0..8 {
            let truth: Vec<usize> = (0..12).map(|k| 90 + k * 200 + (k * 37 % 50)).collect();
            let signal = pulse_train(2500, &truth, 50, seed);
            let mut detector = hrv_detector();
            for window in signal.chunks(250) {
                detector.process_window(window);
            }
            let found = detector.peaks();
            assert_eq!(found.len(), truth.len(), "seed {}", seed);
            for (f, t) in found.iter().zip(&truth) {
                assert!((*f as i64 - *t as i64).abs() <= 1, "found {} expected {}", f, t);
            }
        }
    }

    #[test]
    fn test_peak_on_window_boundary_found_once() {
        let truth = [249, 250 + 200];
        let signal = pulse_train(750, &truth, 0, 0);
        let mut detector = hrv_detector();
        let mut found = Vec::new();
        for window in signal.chunks(250) {
            found.extend(detector.process_window(window));
        }
        assert_eq!(found.len(), 2);
        assert!((found[0] as i64 - 249).abs() <= 1);
    }

    #[test]
    fn test_refractory_distance_is_strict() {
        // Beats every 60 samples are closer than the refractory distance.
        let truth: Vec<usize> = (0..40).map(|k| 30 + k * 60).collect();
        let signal = pulse_train(2500, &truth, 20, 3);
        let mut detector = hrv_detector();
        for window in signal.chunks(250) {
            detector.process_window(window);
        }
        let peaks = detector.peaks();
        assert!(peaks.len() > 1);
        for pair in peaks.windows(2) {
            assert!(pair[1] - pair[0] > detector.min_peak_distance());
        }
    }

    #[test]
    fn test_global_indices_are_strictly_increasing() {
        let truth: Vec<usize> = (0..30).map(|k| 10 + k * 170).collect();
        let signal = pulse_train(5200, &truth, 80, 11);
        let mut detector = PeakDetector::new(0.75, 100);
        // Uneven window sizes must not disturb the global offset.
        let mut rest = signal.as_slice();
        let mut size = 97;
        while !rest.is_empty() {
            let take = size.min(rest.len());
            detector.process_window(&rest[..take]);
            rest = &rest[take..];
            size = if size == 97 { 250 } else { 97 };
        }
        assert_eq!(detector.samples_consumed(), 5200);
        assert!(detector.peaks().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_skipped_samples_keep_stream_positions() {
        let truth: Vec<usize> = (0..10).map(|k| 100 + k * 200).collect();
        let signal = pulse_train(2000, &truth, 0, 0);
        let mut detector = hrv_detector();
        detector.process_window(&signal[..250]);
        // Samples 250..503 are lost.
        detector.skip(253);
        for window in signal[503..].chunks(250) {
            detector.process_window(window);
        }
        assert_eq!(detector.samples_consumed(), 2000);
        let peaks = detector.peaks();
        assert!(peaks.len() >= 8);
        assert!(peaks.iter().all(|p| p % 200 == 101), "{:?}", peaks);
        assert!(peaks.windows(2).all(|w| (w[1] - w[0]) % 200 == 0));
    }

    #[test]
    fn test_detect_uses_buffer_relative_indices() {
        let signal = pulse_train(640, &[100, 300, 500], 0, 0);
        let mut detector = PeakDetector::new(0.75, 100);
        detector.process_window(&signal);
        let peaks = detector.detect(&signal);
        assert_eq!(peaks.len(), 3);
        assert!((peaks[0] as i64 - 100).abs() <= 1);
    }
}
