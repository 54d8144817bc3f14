use super::common::*;
use crate::engine::fallback::FallbackPolicy;
use crate::engine::profile::ProfileError;
use crate::engine::recommend::{Condition, FactorRule};
use crate::engine::scoring::{ScoringEntry, TransferFunction};
use crate::engine::signal::{SignalValue, SourceId, ValueKind};

#[test]
fn reference_profile_is_valid() {
    assert_eq!(profile().validate(at()), Ok(()));
}

#[test]
fn every_source_needs_a_fallback() {
    let mut profile = profile();
    profile.fallbacks = FallbackPolicy::new().with("age", SignalValue::Number(0.0));
    assert_eq!(
        profile.validate(at()),
        Err(ProfileError::MissingFallback(SourceId::new("pulse")))
    );
}

#[test]
fn fallback_must_match_expected_kind() {
    let mut profile = profile();
    profile.fallbacks = fallbacks().with("alarm", SignalValue::Number(0.0));
    assert_eq!(
        profile.validate(at()),
        Err(ProfileError::FallbackKind {
            entry: SourceId::new("alarm"),
            expected: ValueKind::Flag,
            found: ValueKind::Number,
        })
    );
}

#[test]
fn weights_must_be_finite_and_non_negative() {
    let mut profile = profile();
    profile.table = table().with(
        ScoringEntry::new("noise", ValueKind::Number, TransferFunction::Informational)
            .weight(-1.0),
    );
    profile.fallbacks = fallbacks().with("noise", SignalValue::Number(0.0));
    assert_eq!(
        profile.validate(at()),
        Err(ProfileError::InvalidWeight(SourceId::new("noise")))
    );
}

#[test]
fn rules_must_reference_table_sources() {
    let mut profile = profile();
    profile
        .factor_rules
        .push(FactorRule::new("sleep", Condition::Below(7.0), "Insufficient sleep"));
    assert_eq!(
        profile.validate(at()),
        Err(ProfileError::UnknownSource(SourceId::new("sleep")))
    );
}

#[test]
fn duplicate_sources_are_rejected() {
    let mut profile = profile();
    profile.table = table().with(ScoringEntry::new(
        "age",
        ValueKind::Number,
        TransferFunction::Informational,
    ));
    assert_eq!(
        profile.validate(at()),
        Err(ProfileError::DuplicateSource(SourceId::new("age")))
    );
}
