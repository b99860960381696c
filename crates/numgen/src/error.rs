//! Error types for the number generation pool.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the pool can report. Errors fall into three groups:
//!
//! - Configuration errors, raised while constructing workers or the pool.
//! - Protocol violations, raised by the [`Dispatcher`] when a worker does not
//!   acknowledge a command with [`Signal::Success`].
//! - Task failures, raised when a worker task ends abnormally.
//!
//! None of them are retried: every error is terminal for the run.
//!
//! Duplicate or out-of-range values arriving at the collector are not errors;
//! they are dropped silently.
//!
//! [`Dispatcher`]: crate::Dispatcher
//! [`Signal::Success`]: crate::Signal::Success

use crate::control::{Command, WorkerId};
use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the number generation pool.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A construction parameter was out of range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The worker's command channel is closed, so the command was never
    /// delivered.
    #[error("{worker} rejected {command}: command channel closed")]
    CommandRejected { worker: WorkerId, command: Command },

    /// The worker closed its feedback channel without acknowledging.
    #[error("{worker} did not acknowledge {command}: feedback channel closed")]
    NoReply { worker: WorkerId, command: Command },

    /// The worker did not acknowledge within the configured reply timeout.
    #[error("{worker} did not acknowledge {command} within {timeout:?}")]
    ReplyTimeout {
        worker: WorkerId,
        command: Command,
        timeout: Duration,
    },

    /// The collector went away before reaching its target cardinality.
    #[error("Collector exited without signalling completion")]
    CompletionLost,

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {context}")]
    TaskFailed { context: String },
}

impl Error {
    /// Returns the worker a protocol violation is attributed to, if any.
    pub const fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::CommandRejected { worker, .. }
            | Self::NoReply { worker, .. }
            | Self::ReplyTimeout { worker, .. } => Some(*worker),
            _ => None,
        }
    }

    /// Returns the command a protocol violation is attributed to, if any.
    pub const fn command(&self) -> Option<Command> {
        match self {
            Self::CommandRejected { command, .. }
            | Self::NoReply { command, .. }
            | Self::ReplyTimeout { command, .. } => Some(*command),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            context: err.to_string(),
        }
    }
}
