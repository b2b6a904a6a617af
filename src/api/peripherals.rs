//! Peripheral Traits
//!
//! Interfaces of the board hardware the pipeline talks to: the analog front
//! end, the display and the front panel input queue.

use crate::core::events::InputToken;
use crate::model::queue::Sample;

/// Source of raw PPG readings.
///
/// `read` runs in the sampling context once per tick and must return quickly.
pub trait AnalogInput: Send {
    fn read(&mut self) -> Sample;
}

/// Text-and-line display. Nothing is visible until `show` is called.
pub trait Display: Send {
    /// Clears the frame buffer.
    fn clear(&mut self);
    fn text(&mut self, text: &str, x: i32, y: i32);
    fn line(&mut self, from: (i32, i32), to: (i32, i32));
    /// Flushes the frame buffer to the screen.
    fn show(&mut self);
}

/// Queue of discrete front panel events.
pub trait InputEvents: Send {
    /// Removes and returns the next pending token, or `None` if nothing is pending.
    fn try_next(&mut self) -> Option<InputToken>;

    /// Drains pending tokens and reports whether a stop request was among them.
    ///
    /// Navigation tokens are discarded.
    fn stop_requested(&mut self) -> bool {
        let mut stop = false;
        while let Some(token) = self.try_next() {
            stop |= token == InputToken::Stop;
        }
        stop
    }
}
