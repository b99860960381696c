//! Synchronous lifecycle control over every registered worker.
//!
//! The [`Dispatcher`] holds one [`Controllable`] handle per worker and sweeps a
//! single command across all of them. Each command is acknowledged before the
//! next worker is addressed, so a sweep is strictly ordered:
//!
//! - `start_all`: collector, then generators in registration order.
//! - `stop_all` / `destroy_all`: generators in registration order, then the
//!   collector. Producers quiesce before the consumer.
//!
//! The first worker that fails to acknowledge aborts the sweep. Workers that
//! were already commanded are left as they are; there is no rollback.
//!
//! A failure is final. A timed-out command may still be acknowledged later,
//! and that stale reply would be read as the answer to the next command, so
//! every later sweep returns the original error without contacting anyone.

use crate::{
    config::DEFAULT_REPLY_TIMEOUT,
    control::{Command, Controllable, Fault, Signal, WorkerHandle, WorkerId},
    error::{Error, Result},
};
use core::time::Duration;
use tokio::time::timeout;

/// Issues lifecycle commands to a pool of generators and one collector.
///
/// Handles are registered once, before any lifecycle operation. Generic over
/// the handle type so that anything speaking the control protocol can be
/// driven; in production this is [`WorkerHandle`].
#[derive(Debug)]
pub struct Dispatcher<H = WorkerHandle> {
    generators: Vec<H>,
    collector: Option<H>,
    reply_timeout: Option<Duration>,
    failure: Option<Error>,
}

impl<H> Default for Dispatcher<H> {
    fn default() -> Self {
        Self::new(Some(DEFAULT_REPLY_TIMEOUT))
    }
}

impl<H> Dispatcher<H> {
    /// Creates an empty dispatcher. With `reply_timeout` set, a worker that
    /// does not acknowledge in time fails the sweep.
    pub const fn new(reply_timeout: Option<Duration>) -> Self {
        Self {
            generators: Vec::new(),
            collector: None,
            reply_timeout,
            failure: None,
        }
    }

    /// Appends a generator handle. Generators are commanded in the order they
    /// were appended.
    pub fn append_generator(&mut self, handle: H) {
        self.generators.push(handle);
    }

    /// Registers the collector handle, replacing any previous one.
    pub fn append_collector(&mut self, handle: H) {
        self.collector = Some(handle);
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    pub const fn has_collector(&self) -> bool {
        self.collector.is_some()
    }

    /// The error that ended the first failed sweep, if any.
    pub const fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    fn ensure_healthy(&self) -> Result<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn settle(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            self.failure = Some(err.clone());
        }
        result
    }
}

impl<H: Controllable> Dispatcher<H> {
    /// Starts every registered worker and waits for each acknowledgment.
    ///
    /// The collector is started first so no value is discarded while the
    /// generators come up.
    ///
    /// # Errors
    ///
    /// Returns the first protocol violation, naming the worker. Workers after
    /// it receive nothing. Once any sweep has failed, returns that error
    /// without sending anything.
    pub async fn start_all(&mut self) -> Result<()> {
        self.ensure_healthy()?;

        #[cfg(feature = "tracing")]
        tracing::info!("Starting {} generators", self.generators.len());

        let result = self.start_sweep().await;
        self.settle(result)
    }

    /// Stops every generator, then the collector.
    ///
    /// # Errors
    ///
    /// Returns the first protocol violation, naming the worker, or the error
    /// of an earlier failed sweep.
    pub async fn stop_all(&mut self) -> Result<()> {
        self.ensure_healthy()?;

        #[cfg(feature = "tracing")]
        tracing::info!("Stopping all workers");

        let result = self.stop_sweep().await;
        self.settle(result)
    }

    /// Destroys every generator, then the collector, ending every event loop.
    ///
    /// Consumes the dispatcher: a destroyed worker can never be commanded
    /// again through it.
    ///
    /// # Errors
    ///
    /// Returns the first protocol violation, naming the worker, or the error
    /// of an earlier failed sweep.
    pub async fn destroy_all(mut self) -> Result<()> {
        self.ensure_healthy()?;

        #[cfg(feature = "tracing")]
        tracing::info!("Destroying all workers");

        self.sweep_generators(Command::Destroy).await?;
        if let Some(collector) = self.collector.as_mut() {
            command(
                collector,
                WorkerId::Collector,
                Command::Destroy,
                self.reply_timeout,
            )
            .await?;
        }

        #[cfg(feature = "tracing")]
        tracing::info!("All workers destroyed");
        Ok(())
    }

    async fn start_sweep(&mut self) -> Result<()> {
        if let Some(collector) = self.collector.as_mut() {
            command(collector, WorkerId::Collector, Command::Start, self.reply_timeout).await?;
        }
        self.sweep_generators(Command::Start).await
    }

    async fn stop_sweep(&mut self) -> Result<()> {
        self.sweep_generators(Command::Stop).await?;
        if let Some(collector) = self.collector.as_mut() {
            command(collector, WorkerId::Collector, Command::Stop, self.reply_timeout).await?;
        }
        Ok(())
    }

    async fn sweep_generators(&mut self, cmd: Command) -> Result<()> {
        for (idx, generator) in self.generators.iter_mut().enumerate() {
            command(generator, WorkerId::Generator(idx), cmd, self.reply_timeout).await?;
        }
        Ok(())
    }
}

/// Sends one command and waits for its acknowledgment.
async fn command<H: Controllable>(
    handle: &mut H,
    worker: WorkerId,
    command: Command,
    reply_timeout: Option<Duration>,
) -> Result<()> {
    let reply = match reply_timeout {
        Some(limit) => timeout(limit, handle.send(command))
            .await
            .map_err(|_| Error::ReplyTimeout {
                worker,
                command,
                timeout: limit,
            })?,
        None => handle.send(command).await,
    };

    match reply {
        Ok(Signal::Success) => {
            #[cfg(feature = "tracing")]
            tracing::trace!("{worker} acknowledged {command}");
            Ok(())
        }
        Err(fault) => {
            #[cfg(feature = "tracing")]
            tracing::error!("{worker} failed {command}: {fault:?}");

            Err(match fault {
                Fault::Rejected => Error::CommandRejected { worker, command },
                Fault::NoReply => Error::NoReply { worker, command },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(WorkerId, Command)>>>;

    #[derive(Clone, Copy)]
    enum Behavior {
        Ack,
        NoReply,
        Reject,
        Hang,
    }

    struct FakeHandle {
        id: WorkerId,
        behavior: Behavior,
        log: Log,
    }

    impl Controllable for FakeHandle {
        async fn send(&mut self, command: Command) -> core::result::Result<Signal, Fault> {
            if let Behavior::Reject = self.behavior {
                return Err(Fault::Rejected);
            }
            self.log.lock().unwrap().push((self.id, command));

            match self.behavior {
                Behavior::Ack => Ok(Signal::Success),
                Behavior::NoReply | Behavior::Reject => Err(Fault::NoReply),
                Behavior::Hang => core::future::pending().await,
            }
        }
    }

    fn dispatcher(generators: &[Behavior], collector: Behavior) -> (Dispatcher<FakeHandle>, Log) {
        let log = Log::default();
        let mut dispatcher = Dispatcher::new(Some(Duration::from_millis(100)));
        for (idx, &behavior) in generators.iter().enumerate() {
            dispatcher.append_generator(FakeHandle {
                id: WorkerId::Generator(idx),
                behavior,
                log: log.clone(),
            });
        }
        dispatcher.append_collector(FakeHandle {
            id: WorkerId::Collector,
            behavior: collector,
            log: log.clone(),
        });
        (dispatcher, log)
    }

    fn recorded(log: &Log) -> Vec<(WorkerId, Command)> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn start_all_short_circuits_on_failed_generator() {
        let (mut dispatcher, log) =
            dispatcher(&[Behavior::Ack, Behavior::NoReply, Behavior::Ack], Behavior::Ack);

        let err = dispatcher.start_all().await.unwrap_err();
        assert_eq!(
            err,
            Error::NoReply {
                worker: WorkerId::Generator(1),
                command: Command::Start,
            }
        );
        assert_eq!(
            recorded(&log),
            vec![
                (WorkerId::Collector, Command::Start),
                (WorkerId::Generator(0), Command::Start),
                (WorkerId::Generator(1), Command::Start),
            ]
        );
    }

    #[tokio::test]
    async fn stop_all_stops_generators_before_collector() {
        let (mut dispatcher, log) = dispatcher(&[Behavior::Ack, Behavior::Ack], Behavior::Ack);

        dispatcher.stop_all().await.unwrap();
        assert_eq!(
            recorded(&log),
            vec![
                (WorkerId::Generator(0), Command::Stop),
                (WorkerId::Generator(1), Command::Stop),
                (WorkerId::Collector, Command::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn destroy_all_destroys_collector_too() {
        let (dispatcher, log) = dispatcher(&[Behavior::Ack], Behavior::Ack);

        dispatcher.destroy_all().await.unwrap();
        assert_eq!(
            recorded(&log),
            vec![
                (WorkerId::Generator(0), Command::Destroy),
                (WorkerId::Collector, Command::Destroy),
            ]
        );
    }

    #[tokio::test]
    async fn stop_all_skips_collector_after_generator_failure() {
        let (mut dispatcher, log) = dispatcher(&[Behavior::Reject], Behavior::Ack);

        let err = dispatcher.stop_all().await.unwrap_err();
        assert_eq!(
            err,
            Error::CommandRejected {
                worker: WorkerId::Generator(0),
                command: Command::Stop,
            }
        );
        assert!(recorded(&log).is_empty());
    }

    #[tokio::test]
    async fn collector_failure_is_reported() {
        let (dispatcher, _log) = dispatcher(&[Behavior::Ack], Behavior::NoReply);

        let err = dispatcher.destroy_all().await.unwrap_err();
        assert_eq!(err.worker(), Some(WorkerId::Collector));
        assert_eq!(err.command(), Some(Command::Destroy));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_worker_times_out() {
        let (mut dispatcher, log) = dispatcher(&[Behavior::Hang, Behavior::Ack], Behavior::Ack);

        let err = dispatcher.stop_all().await.unwrap_err();
        assert_eq!(
            err,
            Error::ReplyTimeout {
                worker: WorkerId::Generator(0),
                command: Command::Stop,
                timeout: Duration::from_millis(100),
            }
        );
        assert_eq!(recorded(&log), vec![(WorkerId::Generator(0), Command::Stop)]);
    }

    #[tokio::test]
    async fn last_collector_registration_wins() {
        let (mut dispatcher, log) = dispatcher(&[], Behavior::NoReply);
        dispatcher.append_collector(FakeHandle {
            id: WorkerId::Collector,
            behavior: Behavior::Ack,
            log: log.clone(),
        });

        assert!(dispatcher.has_collector());
        assert_eq!(dispatcher.generator_count(), 0);
        dispatcher.start_all().await.unwrap();
        assert_eq!(recorded(&log), vec![(WorkerId::Collector, Command::Start)]);
    }

    #[tokio::test]
    async fn empty_dispatcher_is_a_no_op() {
        let mut dispatcher = Dispatcher::<FakeHandle>::default();
        dispatcher.start_all().await.unwrap();
        dispatcher.stop_all().await.unwrap();
        dispatcher.destroy_all().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sweep_is_final() {
        let (mut dispatcher, log) = dispatcher(&[Behavior::Hang], Behavior::Ack);

        let first = dispatcher.stop_all().await.unwrap_err();
        assert_eq!(dispatcher.failure(), Some(&first));
        assert_eq!(dispatcher.start_all().await, Err(first.clone()));
        assert_eq!(dispatcher.destroy_all().await, Err(first));
        assert_eq!(recorded(&log), vec![(WorkerId::Generator(0), Command::Stop)]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_is_not_taken_for_the_next_command() {
        let (handle, mut link) = control::channel();
        let applied = Arc::new(Mutex::new(Vec::new()));

        let worker = tokio::spawn({
            let applied = applied.clone();
            async move {
                let mut first = true;
                while let Some(cmd) = link.recv().await {
                    if first {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        first = false;
                    }
                    applied.lock().unwrap().push(cmd);
                    if !link.acknowledge().await {
                        break;
                    }
                }
            }
        });

        let mut dispatcher = Dispatcher::new(Some(Duration::from_millis(100)));
        dispatcher.append_generator(handle);

        let err = dispatcher.stop_all().await.unwrap_err();
        assert_eq!(
            err,
            Error::ReplyTimeout {
                worker: WorkerId::Generator(0),
                command: Command::Stop,
                timeout: Duration::from_millis(100),
            }
        );

        // The worker acknowledges the stop after the deadline.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(dispatcher.destroy_all().await, Err(err));
        assert_eq!(*applied.lock().unwrap(), vec![Command::Stop]);

        worker.await.unwrap();
    }
}
