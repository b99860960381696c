use crate::{
    config::{validate_ceiling, validate_interval},
    control::{Command, ControlLink, WorkerId, WorkerState},
    error::Result,
};
use core::time::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};

/// Produces one pseudo-random value per tick while [`WorkerState::Active`].
///
/// The generator owns its tick source and its random source; the only state it
/// shares is a clone of the value channel sender. Values are drawn uniformly
/// from `[0, ceiling)`.
pub struct Generator {
    index: usize,
    interval: Duration,
    ceiling: u64,
    link: ControlLink,
    values: mpsc::Sender<u64>,
    rng: StdRng,
    state: WorkerState,
    ticker: Option<Interval>,
}

enum Event {
    Command(Option<Command>),
    Tick,
}

impl Generator {
    /// Creates a generator seeded from the operating system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if
    /// `interval` or `ceiling` is zero.
    pub fn new(
        index: usize,
        interval: Duration,
        ceiling: u64,
        link: ControlLink,
        values: mpsc::Sender<u64>,
    ) -> Result<Self> {
        Self::with_rng(index, interval, ceiling, link, values, StdRng::from_os_rng())
    }

    /// Creates a generator with a fixed seed, for reproducible sequences.
    pub fn with_seed(
        index: usize,
        interval: Duration,
        ceiling: u64,
        link: ControlLink,
        values: mpsc::Sender<u64>,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(
            index,
            interval,
            ceiling,
            link,
            values,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(
        index: usize,
        interval: Duration,
        ceiling: u64,
        link: ControlLink,
        values: mpsc::Sender<u64>,
        rng: StdRng,
    ) -> Result<Self> {
        validate_interval(interval)?;
        validate_ceiling(ceiling)?;
        Ok(Self {
            index,
            interval,
            ceiling,
            link,
            values,
            rng,
            state: WorkerState::Waiting,
            ticker: None,
        })
    }

    pub const fn id(&self) -> WorkerId {
        WorkerId::Generator(self.index)
    }

    /// Runs the event loop until [`Command::Destroy`] is acknowledged or the
    /// dispatcher side of the control channel is dropped.
    ///
    /// Each iteration waits for either the next command or the next tick.
    /// Commands win ties. The tick source only exists while active, so no
    /// value is ever produced in [`WorkerState::Waiting`].
    ///
    /// Returns the number of values delivered to the collector.
    pub async fn run(mut self) -> u64 {
        #[cfg(feature = "tracing")]
        tracing::trace!("{} started", self.id());

        let mut emitted = 0;

        loop {
            let event = tokio::select! {
                biased;
                cmd = self.link.recv() => Event::Command(cmd),
                () = next_tick(&mut self.ticker) => Event::Tick,
            };

            match event {
                Event::Command(Some(cmd)) => {
                    self.apply(cmd);

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
                    break;
                }
                Event::Tick => {
                    if self.state.is_active() && self.emit().await {
                        emitted += 1;
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("{} stopped after {emitted} values", self.id());

        emitted
    }

    fn apply(&mut self, cmd: Command) {
        self.ticker = match cmd {
            Command::Start => Some(self.arm()),
            Command::Stop | Command::Destroy => None,
        };
        self.state = WorkerState::after(cmd);
    }

    /// Builds a fresh tick source whose first tick is one interval from now.
    fn arm(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Draws a value and hands it to the collector, waiting for room in the
    /// value channel.
    async fn emit(&mut self) -> bool {
        let value = self.rng.random_range(0..self.ceiling);

        match self.values.send(value).await {
            Ok(()) => true,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("{} dropped value {}: collector gone", self.id(), _e.0);
                false
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => core::future::pending().await,
    }
}
