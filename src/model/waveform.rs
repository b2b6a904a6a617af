//! Waveform Plot
//!
//! Scales the rolling live buffer into one row coordinate per display column.

use super::queue::Sample;

/// Layout of the plot area on the display.
#[derive(Clone, Copy, Debug)]
pub struct PlotArea {
    pub columns: usize,
    pub height: i32,
    pub top: i32,
}

/// Averages consecutive segments of `buffer` into `area.columns` points and maps
/// them to row coordinates, larger samples drawn higher.
///
/// Returns an empty vector when the buffer is shorter than the number of columns.
pub fn scale_waveform(buffer: &[Sample], area: PlotArea) -> Vec<i32> {
    if area.columns == 0 || buffer.len() < area.columns {
        return Vec::new();
    }
    let segment = buffer.len() / area.columns;
    let min = buffer.iter().copied().min().unwrap_or(0) as f64;
    let max = buffer.iter().copied().max().unwrap_or(0) as f64;
    let range = if max > min { max - min } else { 1.0 };

    buffer
        .chunks(segment)
        .take(area.columns)
        .map(|chunk| {
            let avg = chunk.iter().map(|&s| s as f64).sum::<f64>() / chunk.len() as f64;
            let y = (((avg - min) * area.height as f64 / range) as i32).clamp(0, area.height);
            area.top + (area.height - y)
        })
        .collect()
}
