//! Observability: structured logging setup and metric recording.
//!
//! Library code only emits `tracing` events and `metrics` updates; installing
//! a subscriber or a metrics recorder is left to the embedding binary.

pub mod logging;
pub mod metrics;
