use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Nominal sample rate of the analog front end in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 250.0;
/// Ring buffer capacity, two seconds of samples at the default rate.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;
/// Samples per detection window, one second at the default rate.
pub const DEFAULT_WINDOW_SIZE: usize = 250;
/// Highest sample rate with a representable tick period.
pub const MAX_SAMPLE_RATE: f64 = 100_000.0;
/// Upper bound for every configured duration, one day.
pub const MAX_DURATION_S: f64 = 86_400.0;
/// Minimum spacing between two accepted beats in seconds.
pub const REFRACTORY_PERIOD_S: f64 = 0.4;

/// Threshold factor used by the live heart rate screen.
pub const LIVE_THRESHOLD_FACTOR: f64 = 0.75;
/// Threshold factor used while collecting intervals for HRV analysis.
pub const HRV_THRESHOLD_FACTOR: f64 = 0.85;

pub const MIN_DISPLAY_BPM: f64 = 30.0;
pub const MAX_DISPLAY_BPM: f64 = 240.0;
pub const MIN_HRV_PPI_S: f64 = 0.6;
pub const MAX_HRV_PPI_S: f64 = 1.2;

/// Samples kept for the live screen (128 columns of 5 samples).
pub const LIVE_BUFFER_LEN: usize = 640;
pub const LIVE_CHUNK_LEN: usize = 20;

pub const DISPLAY_WIDTH: usize = 128;
pub const PLOT_HEIGHT: i32 = 45;
pub const PLOT_TOP: i32 = 18;

pub const HRV_TOPIC: &str = "hrv";
pub const CLOUD_REQUEST_TOPIC: &str = "kubios-request";
pub const CLOUD_RESPONSE_TOPIC: &str = "kubios-response";
pub const CLOUD_REQUEST_ID: u32 = 9994;
pub const MIN_CLOUD_PPI_COUNT: usize = 5;

pub const HISTORY_FILE: &str = "data/history.json";
pub const HISTORY_LIMIT: usize = 5;

/// Format of the timestamp stored with every history record.
pub const HISTORY_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day].[month].[year] [hour]:[minute]");
