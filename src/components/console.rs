//! Console Display
//!
//! Renders the text layer of each frame to a writer, one line per text item in
//! top-to-bottom order. Line primitives (the waveform) have no console
//! representation and are only counted.

use crate::api::peripherals::Display;
use log::{trace, warn};
use std::io::Write;

pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
    frame: Vec<(i32, i32, String)>,
    lines: usize,
    /// Text of the last frame written, so unchanged frames are not repeated.
    last_shown: Option<String>,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frame: Vec::new(),
            lines: 0,
            last_shown: None,
        }
    }

    fn render(&mut self) -> String {
        self.frame.sort_by_key(|(x, y, _)| (*y, *x));
        self.frame
            .iter()
            .map(|(_, _, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<W: Write + Send> Display for ConsoleDisplay<W> {
    fn clear(&mut self) {
        self.frame.clear();
        self.lines = 0;
    }

    fn text(&mut self, text: &str, x: i32, y: i32) {
        self.frame.push((x, y, text.to_string()));
    }

    fn line(&mut self, _from: (i32, i32), _to: (i32, i32)) {
        self.lines += 1;
    }

    fn show(&mut self) {
        let rendered = self.render();
        trace!("frame with {} text items, {} lines", self.frame.len(), self.lines);
        if rendered.is_empty() || self.last_shown.as_deref() == Some(rendered.as_str()) {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}\n", rendered).and_then(|_| self.out.flush()) {
            warn!("could not write to console: {}", e);
        }
        self.last_shown = Some(rendered);
    }
}
