//! Observation sinks for the collector.
//!
//! Each time the collector stores a new unique value it renders the full
//! sorted sequence to a [`Sink`]. Rendering is a pure side effect and never
//! feeds back into the control flow, so sink implementations swallow their own
//! I/O errors.

use std::io::{self, Write};

/// Receives the collector's sequence after every accepted value.
pub trait Sink: Send {
    /// Renders the current sorted, duplicate-free sequence.
    fn render(&mut self, values: &[u64]);

    /// Flushes any pending output. Called once when the collector is
    /// destroyed.
    fn finish(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn render(&mut self, _values: &[u64]) {}
}

/// Rewrites a single `Total: [..]` line on stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    dirty: bool,
}

impl ConsoleSink {
    pub const fn new() -> Self {
        Self { dirty: false }
    }
}

impl Sink for ConsoleSink {
    fn render(&mut self, values: &[u64]) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\rTotal: {values:?}");
        let _ = out.flush();
        self.dirty = true;
    }

    fn finish(&mut self) {
        if self.dirty {
            let mut out = io::stdout().lock();
            let _ = writeln!(out);
            let _ = out.flush();
            self.dirty = false;
        }
    }
}
