//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`provider`] — [`MockProvider`](provider::MockProvider): scripted
//!   snapshots or errors, call counting, optional latency.
//! - [`handler`] — [`CountingHandler`](handler::CountingHandler): a scan
//!   handler that records calls and detects overlapping runs.
//! - [`repository`] — [`RecordingRepository`](repository::RecordingRepository):
//!   wraps a repository with call counters and injectable failures.
//! - [`config`] — Canonical band, cadence and scheduler configurations.
//! - [`domain`] — Builders for addresses and snapshots.

pub mod config;
pub mod domain;
pub mod handler;
pub mod provider;
pub mod repository;
