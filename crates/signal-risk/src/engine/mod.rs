//! Domain-independent signal aggregation and risk scoring.
//!
//! A [`DomainProfile`] describes one instantiation: which sources exist, how
//! each reading maps to a partial score, which defaults stand in for missing
//! readings, and how scores become tiers, recommendations and alerts. The
//! [`RiskPipeline`] runs that description against a [`SignalProvider`].

pub mod alerts;
pub mod classifier;
pub mod fallback;
pub mod pipeline;
pub mod profile;
pub mod recommend;
pub mod scoring;
pub mod signal;
pub mod source;

#[cfg(test)]
mod tests;

pub use alerts::{
    Alert, AlertDispatcher, AlertError, AlertId, AlertLog, AlertPolicy, AlertSink,
    DeliveryReceipt, HttpAlertSink, NotificationPayload,
};
pub use classifier::{
    ActiveOverride, Classifier, OverrideRule, Tier, TierBand, TierBandError, TierBands,
};
pub use fallback::{FallbackDefault, FallbackPolicy};
pub use pipeline::{Assessment, RiskPipeline};
pub use profile::{DomainProfile, ProfileError};
pub use recommend::{
    Condition, FactorRule, RecommendationGenerator, RecommendationPlan, RiskFactor,
};
pub use scoring::{
    Band, DataQuality, ScoreComponent, ScoreRecord, ScoringEngine, ScoringEntry, ScoringTable,
    SourceHealth, TransferFunction, WeatherCrowdFactor,
};
pub use signal::{
    GeoPosition, MotionVector, ScheduledEvent, Signal, SignalValue, SourceCategory, SourceId,
    SubjectId, ValueKind, VenueOccupancy, WeatherReading,
};
pub use source::{AcquireError, SignalProvider, SignalSource};
