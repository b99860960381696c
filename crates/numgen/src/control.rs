//! The command/feedback control protocol shared by every worker.
//!
//! Each worker owns exactly one control channel pair, created by [`channel`]:
//!
//! - The dispatcher keeps the [`WorkerHandle`] (send commands, receive
//!   signals).
//! - The worker keeps the [`ControlLink`] (receive commands, send signals).
//!
//! The protocol is request/reply: after applying a [`Command`] the worker sends
//! exactly one [`Signal`] before it looks at the next command. Failure is the
//! absence of [`Signal::Success`], observed by the sender as a [`Fault`].
//!
//! The dispatcher only depends on the [`Controllable`] capability, so
//! generators and the collector are driven through the same handle shape.

use crate::config::CONTROL_BUFFER_SIZE;
use core::fmt;
use tokio::sync::mpsc;

/// A lifecycle instruction sent to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter [`WorkerState::Active`] and begin the payload action.
    Start,
    /// Return to [`WorkerState::Waiting`] and pause the payload action.
    Stop,
    /// Return to [`WorkerState::Waiting`], acknowledge, and exit the event
    /// loop. No further commands are processed.
    Destroy,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// An acknowledgment sent by a worker once a command has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Success,
}

/// Governs whether a worker performs its payload action.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    #[default]
    Waiting,
    Active,
}

impl WorkerState {
    /// Returns the state a worker is in after applying `command`.
    pub const fn after(command: Command) -> Self {
        match command {
            Command::Start => Self::Active,
            Command::Stop | Command::Destroy => Self::Waiting,
        }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Identifies a registered worker in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerId {
    /// A generator, by registration index.
    Generator(usize),
    Collector,
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generator(idx) => write!(f, "generator #{idx}"),
            Self::Collector => write!(f, "collector"),
        }
    }
}

/// Why a command did not produce a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The command channel is closed; the worker has exited.
    Rejected,
    /// The feedback channel closed before a reply arrived.
    NoReply,
}

/// The capability the dispatcher drives: deliver a command and wait for the
/// worker's acknowledgment.
///
/// Implementations must resolve only after the worker has applied the
/// command.
pub trait Controllable: Send {
    fn send(
        &mut self,
        command: Command,
    ) -> impl Future<Output = Result<Signal, Fault>> + Send;
}

/// Dispatcher-side end of a control channel pair.
#[derive(Debug)]
pub struct WorkerHandle {
    commands: mpsc::Sender<Command>,
    feedback: mpsc::Receiver<Signal>,
}

impl Controllable for WorkerHandle {
    async fn send(&mut self, command: Command) -> Result<Signal, Fault> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Fault::Rejected)?;
        self.feedback.recv().await.ok_or(Fault::NoReply)
    }
}

/// Worker-side end of a control channel pair.
#[derive(Debug)]
pub struct ControlLink {
    commands: mpsc::Receiver<Command>,
    feedback: mpsc::Sender<Signal>,
}

impl ControlLink {
    /// Waits for the next command. Returns `None` once the dispatcher side
    /// has been dropped.
    pub async fn recv(&mut self) -> Option<Command> {
        self.commands.recv().await
    }

    /// Replies [`Signal::Success`] to the command just applied.
    ///
    /// Returns `false` if nobody is listening anymore.
    pub async fn acknowledge(&self) -> bool {
        self.feedback.send(Signal::Success).await.is_ok()
    }
}

/// Creates a bounded control channel pair for one worker.
pub fn channel() -> (WorkerHandle, ControlLink) {
    let (cmd_tx, cmd_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
    let (sig_tx, sig_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
    (
        WorkerHandle {
            commands: cmd_tx,
            feedback: sig_rx,
        },
        ControlLink {
            commands: cmd_rx,
            feedback: sig_tx,
        },
    )
}
