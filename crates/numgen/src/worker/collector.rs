use crate::{
    config::validate_ceiling,
    control::{Command, ControlLink, Signal, WorkerId, WorkerState},
    error::{Error, Result},
    sink::Sink,
};
use tokio::sync::{mpsc, oneshot};

/// An ascending, duplicate-free sequence of values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortedValues {
    values: Vec<u64>,
}

impl SortedValues {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Inserts `value` at its sorted position. Returns `false`, leaving the
    /// sequence untouched, if the value is already present.
    pub fn insert(&mut self, value: u64) -> bool {
        match self.values.binary_search(&value) {
            Ok(_) => false,
            Err(pos) => {
                self.values.insert(pos, value);
                true
            }
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.values
    }
}

/// Fans in values from every generator, keeps the unique ones in sorted
/// order, and announces completion once it holds `ceiling` distinct values.
///
/// Values arriving while [`WorkerState::Waiting`] are drained and discarded so
/// that generators blocked on a full value channel can always make progress.
pub struct Collector<S> {
    link: ControlLink,
    values: mpsc::Receiver<u64>,
    store: SortedValues,
    ceiling: u64,
    target: usize,
    state: WorkerState,
    completion: Option<oneshot::Sender<Signal>>,
    sink: S,
}

enum Event {
    Command(Option<Command>),
    Value(u64),
}

impl<S: Sink> Collector<S> {
    /// Creates a collector targeting `ceiling` distinct values in
    /// `[0, ceiling)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `ceiling` is zero or does not fit
    /// in `usize`.
    pub fn new(
        ceiling: u64,
        link: ControlLink,
        values: mpsc::Receiver<u64>,
        completion: oneshot::Sender<Signal>,
        sink: S,
    ) -> Result<Self> {
        validate_ceiling(ceiling)?;
        let target = usize::try_from(ceiling).map_err(|_| Error::InvalidConfig {
            reason: format!("ceiling {ceiling} exceeds addressable memory"),
        })?;

        Ok(Self {
            link,
            values,
            store: SortedValues::default(),
            ceiling,
            target,
            state: WorkerState::Waiting,
            completion: Some(completion),
            sink,
        })
    }

    pub const fn id(&self) -> WorkerId {
        WorkerId::Collector
    }

    /// Runs the event loop until [`Command::Destroy`] is acknowledged or the
    /// dispatcher side of the control channel is dropped.
    ///
    /// Returns the collected values in ascending order.
    pub async fn run(mut self) -> Vec<u64> {
        #[cfg(feature = "tracing")]
        tracing::trace!("{} started, target {}", self.id(), self.target);

        loop {
            // Once every generator is gone `recv` yields `None`, which
            // disables the value branch for this iteration only.
            let event = tokio::select! {
                biased;
                cmd = self.link.recv() => Event::Command(cmd),
                Some(value) = self.values.recv() => Event::Value(value),
            };

            match event {
                Event::Command(Some(cmd)) => {
                    self.state = WorkerState::after(cmd);
                    if cmd == Command::Destroy {
                        self.sink.finish();
                    }

                    if !self.link.acknowledge().await {
                        #[cfg(feature = "tracing")]
                        tracing::error!("{} failed to acknowledge {cmd}", self.id());
                    }

                    if cmd == Command::Destroy {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("{} destroyed", self.id());
                        break;
                    }
                }
                Event::Command(None) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("{} control channel closed", self.id());
                    self.sink.finish();
                    break;
                }
                Event::Value(value) => self.accept(value),
            }
        }

        self.store.into_vec()
    }

    fn accept(&mut self, value: u64) {
        if !self.state.is_active() || value >= self.ceiling {
            return;
        }
        if !self.store.insert(value) {
            return;
        }

        self.sink.render(self.store.as_slice());

        if self.store.len() < self.target {
            return;
        }

        // `take` guarantees a single completion per collector lifetime.
        if let Some(completion) = self.completion.take() {
            #[cfg(feature = "tracing")]
            tracing::info!("{} reached {} distinct values", self.id(), self.target);

            if completion.send(Signal::Success).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!("{} completion receiver dropped", self.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_rejects_duplicates() {
        let mut store = SortedValues::with_capacity(8);
        for value in [5, 1, 9, 1, 3, 5, 0] {
            store.insert(value);
            assert!(store.as_slice().windows(2).all(|w| w[0] < w[1]));
        }
        assert_eq!(store.as_slice(), &[0, 1, 3, 5, 9]);
    }

    #[test]
    fn duplicate_leaves_length_unchanged() {
        let mut store = SortedValues::default();
        assert!(store.insert(7));
        let len = store.len();
        assert!(!store.insert(7));
        assert_eq!(store.len(), len);
        assert!(store.contains(7));
        assert!(!store.contains(8));
    }

    #[test]
    fn empty_store() {
        let store = SortedValues::default();
        assert!(store.is_empty());
        assert!(store.into_vec().is_empty());
    }
}
