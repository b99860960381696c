//! Worker event loops.
//!
//! Each worker is designed to be spawned as its own Tokio task. It owns a
//! [`ControlLink`](crate::control::ControlLink) and waits, on every
//! iteration, for whichever comes first: the next command or its own payload
//! event.
//!
//! - [`Generator`] - emits a random value on every tick while active.
//! - [`Collector`] - stores unique values and signals completion.
//!
//! Both speak the same protocol: apply the command's state transition, reply
//! [`Signal::Success`](crate::Signal::Success), and only then look at the next
//! event. [`Command::Destroy`](crate::Command::Destroy) is acknowledged like
//! any other command and then ends the loop.

mod collector;
mod generator;


pub use collector::{Collector, SortedValues};
pub use generator::Generator;
