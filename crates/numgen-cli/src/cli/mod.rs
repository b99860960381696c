//! Process-level plumbing around a [`numgen::NumberPool`].
//!
//! ## Structure
//!
//! - [`config`] - CLI flags and their validation into a [`numgen::PoolConfig`].
//! - [`sink`] - metered wrapper around the console sink.
//! - [`telemetry`] - log subscriber and optional OpenTelemetry export.

pub mod config;
pub mod sink;
pub mod telemetry;
