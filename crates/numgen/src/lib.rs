#![doc = include_str!("../README.md")]

mod config;
mod control;
mod dispatcher;
mod error;
mod pool;
mod sink;
mod worker;

pub use crate::config::*;
pub use crate::control::*;
pub use crate::dispatcher::*;
pub use crate::error::*;
pub use crate::pool::*;
pub use crate::sink::*;
pub use crate::worker::*;
