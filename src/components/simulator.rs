//! Synthetic PPG Front End
//!
//! Stands in for the optical sensor and ADC when no hardware is attached: a
//! train of Gaussian pulses on a constant baseline, with optional beat-to-beat
//! jitter and uniform measurement noise.

use crate::{api::peripherals::AnalogInput, model::queue::Sample};
use rand::{rngs::StdRng, Rng, SeedableRng};

const BASELINE: f64 = 30_000.0;
const AMPLITUDE: f64 = 20_000.0;
/// Pulse width (one standard deviation) in seconds.
const PULSE_WIDTH_S: f64 = 0.032;

#[derive(Debug)]
pub struct SyntheticPpg {
    sample_rate: f64,
    interval: f64,
    jitter: f64,
    noise: i32,
    sigma: f64,
    position: u64,
    previous_beat: Option<f64>,
    next_beat: f64,
    rng: StdRng,
}

impl SyntheticPpg {
    /// Noise-free pulses at a constant `bpm`; the first beat falls half an interval in.
    pub fn new(sample_rate: f64, bpm: f64) -> Self {
        let interval = 60.0 * sample_rate / bpm;
        Self {
            sample_rate,
            interval,
            jitter: 0.0,
            noise: 0,
            sigma: PULSE_WIDTH_S * sample_rate,
            position: 0,
            previous_beat: None,
            next_beat: (interval / 2.0).round(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Varies every interval uniformly by up to `jitter_ms`.
    pub fn with_jitter(mut self, jitter_ms: f64) -> Self {
        self.jitter = jitter_ms * self.sample_rate / 1000.0;
        self
    }

    /// Adds uniform noise of up to `amplitude` ADC counts.
    pub fn with_noise(mut self, amplitude: i32) -> Self {
        self.noise = amplitude.max(0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn pulse(&self, beat: f64) -> f64 {
        let d = self.position as f64 - beat;
        AMPLITUDE * (-d * d / (2.0 * self.sigma * self.sigma)).exp()
    }

    fn advance_beats(&mut self) {
        while self.position as f64 > self.next_beat + 5.0 * self.sigma {
            let jitter = if self.jitter > 0.0 {
                self.rng.gen_range(-self.jitter..=self.jitter)
            } else {
                0.0
            };
            self.previous_beat = Some(self.next_beat);
            self.next_beat = (self.next_beat + self.interval + jitter).round();
        }
    }
}

impl AnalogInput for SyntheticPpg {
    fn read(&mut self) -> Sample {
        self.advance_beats();
        let mut value = BASELINE + self.pulse(self.next_beat);
        if let Some(previous) = self.previous_beat {
            value += self.pulse(previous);
        }
        if self.noise > 0 {
            value += self.rng.gen_range(-self.noise..=self.noise) as f64;
        }
        self.position += 1;
        value.round().clamp(0.0, Sample::MAX as f64) as Sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_maxima_at_beats() {
        let mut ppg = SyntheticPpg::new(250.0, 75.0);
        let signal: Vec<Sample> = (0..1000).map(|_| ppg.read()).collect();
        let maxima: Vec<usize> = (1..signal.len() - 1)
            .filter(|&i| signal[i] > signal[i - 1] && signal[i] > signal[i + 1])
            .collect();
        assert_eq!(maxima, vec![100, 300, 500, 700, 900]);
        assert_eq!(signal[100], 50_000);
    }

    #[test]
    fn test_jitter_keeps_rate() {
        let mut ppg = SyntheticPpg::new(250.0, 60.0).with_jitter(40.0).with_seed(7);
        let signal: Vec<Sample> = (0..25_000).map(|_| ppg.read()).collect();
        let beats = (1..signal.len() - 1)
            .filter(|&i| signal[i] > signal[i - 1] && signal[i] > signal[i + 1])
            .count();
        assert!((99..=101).contains(&beats), "{} beats", beats);
    }
}
