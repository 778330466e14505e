//! Observability utilities for the kernel.
//!
//! The [`Telemetry`] handle is constructed once by the host process and passed
//! to every component that reports through it. [`install_subscriber`] wires
//! `tracing` output to stdout as human-readable or JSON lines.

#![warn(missing_docs, clippy::pedantic)]

mod handle;
mod subscriber;

pub use handle::{Telemetry, TelemetrySnapshot, format_latency};
pub use subscriber::{LogFormat, SubscriberConfig, TelemetryError, install_subscriber};
