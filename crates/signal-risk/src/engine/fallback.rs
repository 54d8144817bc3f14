use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::signal::{SignalValue, SourceId};

/// Registered substitute for one source.
#[derive(Debug, Clone)]
pub enum FallbackDefault {
    /// Constant reading.
    Fixed(SignalValue),
    /// Reading whose timestamps are offsets from the acquisition instant
    /// (e.g. "an event starting two hours from now").
    Anchored(fn(DateTime<Utc>) -> SignalValue),
}

impl FallbackDefault {
    pub fn resolve(&self, at: DateTime<Utc>) -> SignalValue {
        match self {
            FallbackDefault::Fixed(value) => value.clone(),
            FallbackDefault::Anchored(build) => build(at),
        }
    }
}

/// Per-source deterministic defaults used when acquisition fails.
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    defaults: BTreeMap<SourceId, FallbackDefault>,
}

impl FallbackPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, value: SignalValue) -> Self {
        self.defaults
            .insert(SourceId::new(source), FallbackDefault::Fixed(value));
        self
    }

    pub fn with_anchored(mut self, source: &str, build: fn(DateTime<Utc>) -> SignalValue) -> Self {
        self.defaults
            .insert(SourceId::new(source), FallbackDefault::Anchored(build));
        self
    }

    pub fn contains(&self, source: &SourceId) -> bool {
        self.defaults.contains_key(source)
    }

    /// Substitute value for `source`, materialized at `at`.
    pub fn default_for(&self, source: &SourceId, at: DateTime<Utc>) -> Option<SignalValue> {
        self.defaults.get(source).map(|default| default.resolve(at))
    }
}
