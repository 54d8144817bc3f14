//! Recompute orchestration shared by the stroke and crowd workflows: per-subject
//! serialization, periodic monitors, the latest-assessment repository and the
//! HTTP surface.

pub mod monitor;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use monitor::{spawn_monitor, MonitorHandle};
pub use repository::{AssessmentRepository, RepositoryError};
pub use router::{risk_router, RiskApi};
pub use service::AssessmentService;
