//! Wiring and running a complete generator/collector pool.
//!
//! [`NumberPool::spawn`] builds every worker up front, so an invalid
//! configuration fails before any task exists. It then spawns one Tokio task
//! per worker and registers each control handle with a [`Dispatcher`].
//!
//! [`NumberPool::run`] drives the whole lifecycle:
//!
//! 1. `start_all`
//! 2. wait for the collector's completion signal
//! 3. `stop_all`, then `destroy_all`
//! 4. wait for every event loop to return
//!
//! Any protocol violation aborts the run. Dropping the pool at that point
//! drops the dispatcher, which closes every command channel and lets the
//! remaining event loops exit on their own.

use crate::{
    config::PoolConfig,
    control::{self, Signal},
    dispatcher::Dispatcher,
    error::{Error, Result},
    sink::Sink,
    worker::{Collector, Generator},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::task::TaskTracker;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Every distinct value the collector stored, ascending.
    pub values: Vec<u64>,
    /// `true` if the collector reached its target cardinality, `false` if the
    /// run was cut short by the shutdown future.
    pub completed: bool,
    /// Values delivered to the collector across all generators, duplicates
    /// included.
    pub emitted: u64,
}

/// A running set of generators and one collector, controlled through a
/// [`Dispatcher`].
pub struct NumberPool {
    dispatcher: Dispatcher,
    completion: oneshot::Receiver<Signal>,
    generators: Vec<JoinHandle<u64>>,
    collector: JoinHandle<Vec<u64>>,
    tracker: TaskTracker,
}

impl NumberPool {
    /// Constructs and spawns every worker. All workers start out
    /// [`Waiting`](crate::WorkerState::Waiting).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` is invalid. No task is
    /// spawned in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn<S>(config: &PoolConfig, sink: S) -> Result<Self>
    where
        S: Sink + 'static,
    {
        config.validate()?;

        let (values_tx, values_rx) = mpsc::channel(config.value_buffer);
        let (completion_tx, completion) = oneshot::channel();
        let mut dispatcher = Dispatcher::new(config.reply_timeout);

        let (collector_handle, collector_link) = control::channel();
        let collector = Collector::new(
            config.ceiling,
            collector_link,
            values_rx,
            completion_tx,
            sink,
        )?;
        dispatcher.append_collector(collector_handle);

        let mut generators = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let (handle, link) = control::channel();
            generators.push(Generator::new(
                index,
                config.interval,
                config.ceiling,
                link,
                values_tx.clone(),
            )?);
            dispatcher.append_generator(handle);
        }
        // Only generators hold value senders, so the channel closes once the
        // last one exits.
        drop(values_tx);

        let tracker = TaskTracker::new();
        let collector = tracker.spawn(collector.run());
        let generators = generators
            .into_iter()
            .map(|generator| tracker.spawn(generator.run()))
            .collect();
        tracker.close();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Spawned {} generators (ceiling {}, interval {:?}, buffer {})",
            config.workers,
            config.ceiling,
            config.interval,
            config.value_buffer
        );

        Ok(Self {
            dispatcher,
            completion,
            generators,
            collector,
            tracker,
        })
    }

    /// Runs until the collector holds every value in `[0, ceiling)`, then
    /// shuts the pool down.
    ///
    /// # Errors
    ///
    /// Returns the first protocol violation, [`Error::CompletionLost`] if the
    /// collector exits early, or [`Error::TaskFailed`] if a worker panicked.
    pub async fn run(self) -> Result<RunReport> {
        self.run_until(core::future::pending()).await
    }

    /// Like [`NumberPool::run`], but also shuts down early once `shutdown`
    /// resolves (e.g. on Ctrl+C).
    ///
    /// # Errors
    ///
    /// See [`NumberPool::run`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn run_until<F>(self, shutdown: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let Self {
            mut dispatcher,
            completion,
            generators,
            collector,
            tracker,
        } = self;

        dispatcher.start_all().await?;

        let completed = tokio::select! {
            signal = completion => match signal {
                Ok(Signal::Success) => true,
                Err(_) => return Err(Error::CompletionLost),
            },
            () = shutdown => {
                #[cfg(feature = "tracing")]
                tracing::info!("Shutdown requested before completion");
                false
            },
        };

        dispatcher.stop_all().await?;
        dispatcher.destroy_all().await?;

        tracker.wait().await;

        let mut emitted = 0;
        for generator in generators {
            emitted += generator.await?;
        }
        let values = collector.await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Pool shut down with {} distinct values ({emitted} emitted)",
            values.len()
        );

        Ok(RunReport {
            values,
            completed,
            emitted,
        })
    }
}
