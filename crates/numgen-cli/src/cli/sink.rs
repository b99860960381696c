use super::telemetry::increment_values_accepted;
use numgen::Sink;

/// Forwards to an inner [`Sink`], counting every accepted value.
///
/// The collector renders exactly once per newly stored value, so each render
/// is one accepted value.
pub struct MeteredSink<S> {
    inner: S,
}

impl<S: Sink> MeteredSink<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Sink> Sink for MeteredSink<S> {
    fn render(&mut self, values: &[u64]) {
        increment_values_accepted();
        self.inner.render(values);
    }

    fn finish(&mut self) {
        self.inner.finish();
    }
}
