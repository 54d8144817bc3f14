//! Multi-source signal aggregation and risk scoring.
//!
//! Heterogeneous, independently unreliable signals are acquired per subject,
//! substituted with deterministic fallbacks when unavailable, combined into a
//! bounded score, classified into a severity tier, and turned into
//! recommendations and alerts.

pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;
pub mod workflows;
