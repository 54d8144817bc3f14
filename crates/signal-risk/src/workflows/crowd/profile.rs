//! Crowd-density instantiation of the scoring engine.

use chrono::{DateTime, Duration, Utc};

use crate::engine::{
    AlertPolicy, DomainProfile, FallbackPolicy, GeoPosition, MotionVector, ProfileError,
    RecommendationPlan, ScheduledEvent, ScoringEntry, ScoringTable, SignalValue, SourceCategory,
    SourceId, Tier, TierBand, TierBands, TransferFunction, ValueKind, VenueOccupancy,
    WeatherCrowdFactor, WeatherReading,
};

pub const DOMAIN: &str = "crowd";

pub const POSITION: &str = "position";
pub const WEATHER: &str = "weather";
pub const VENUES: &str = "venues";
pub const EVENTS: &str = "events";
pub const NEARBY_DEVICES: &str = "nearby_devices";
pub const MOTION: &str = "motion";

pub const CRITICAL_ACTIONS: [&str; 1] = ["CRITICAL: Very High Density - Move to Exits Calmly"];
pub const HIGH_ACTIONS: [&str; 1] = ["WARNING: High Density - Consider Moving"];
pub const CLOSING: &str = "Continue monitoring crowd levels";
pub const CLOSING_INCOMPLETE: &str = "Continue monitoring crowd levels; some readings are estimated";

/// How far either side of "now" an event still draws a crowd.
pub fn event_window() -> Duration {
    Duration::hours(2)
}

fn real_time(entry: ScoringEntry) -> ScoringEntry {
    entry.category(SourceCategory::RealTime)
}

pub fn scoring_table() -> ScoringTable {
    ScoringTable::new()
        .with(real_time(ScoringEntry::new(
            POSITION,
            ValueKind::Position,
            TransferFunction::Informational,
        )))
        .with(real_time(ScoringEntry::new(
            WEATHER,
            ValueKind::Weather,
            TransferFunction::WeatherFactor(WeatherCrowdFactor::default()),
        )))
        .with(real_time(ScoringEntry::new(
            VENUES,
            ValueKind::Venues,
            TransferFunction::VenueOccupancy { scale: 0.3 },
        )))
        .with(real_time(ScoringEntry::new(
            EVENTS,
            ValueKind::Events,
            TransferFunction::EventOccupancy {
                per_event: 40.0,
                window: event_window(),
                cap: 60.0,
            },
        )))
        .with(real_time(
            ScoringEntry::new(
                NEARBY_DEVICES,
                ValueKind::Number,
                TransferFunction::Linear {
                    per_unit: 8.0,
                    cap: 40.0,
                },
            )
            .unit("devices"),
        ))
        .with(real_time(
            ScoringEntry::new(
                MOTION,
                ValueKind::Motion,
                TransferFunction::MotionMagnitude {
                    scale: 3.0,
                    cap: 25.0,
                },
            )
            .unit("m/s²"),
        ))
}

fn venue(name: &str, rating_count: u32, occupancy_estimate: f64) -> VenueOccupancy {
    VenueOccupancy {
        name: name.to_string(),
        rating_count,
        occupancy_estimate,
    }
}

/// Two scheduled events anchored to the acquisition instant.
pub fn fallback_events(at: DateTime<Utc>) -> SignalValue {
    SignalValue::Events(vec![
        ScheduledEvent {
            name: "Summer Music Festival".to_string(),
            starts_at: at + Duration::hours(2),
            capacity: 5_000,
            sold: 4_200,
            venue: "Central Park Amphitheater".to_string(),
        },
        ScheduledEvent {
            name: "Tech Conference 2025".to_string(),
            starts_at: at + Duration::hours(4),
            capacity: 1_200,
            sold: 980,
            venue: "Convention Center".to_string(),
        },
    ])
}

pub fn fallbacks() -> FallbackPolicy {
    FallbackPolicy::new()
        .with(
            POSITION,
            SignalValue::Position(GeoPosition {
                latitude: 40.7128,
                longitude: -74.0060,
                accuracy: 10.0,
            }),
        )
        .with(
            WEATHER,
            SignalValue::Weather(WeatherReading {
                temperature: 22.0,
                condition: "partly cloudy".to_string(),
                humidity: 65.0,
            }),
        )
        .with(
            VENUES,
            SignalValue::Venues(vec![
                venue("Central Mall", 1_847, 85.0),
                venue("Metro Station", 923, 92.0),
                venue("City Park", 567, 45.0),
                venue("Sports Arena", 2_341, 78.0),
            ]),
        )
        .with_anchored(EVENTS, fallback_events)
        .with(NEARBY_DEVICES, SignalValue::Number(4.0))
        .with(
            MOTION,
            SignalValue::Motion(MotionVector {
                x: 0.5,
                y: -9.8,
                z: 0.2,
            }),
        )
}

pub fn checklist() -> Vec<SourceId> {
    [POSITION, WEATHER, VENUES, EVENTS, NEARBY_DEVICES, MOTION]
        .into_iter()
        .map(SourceId::new)
        .collect()
}

pub fn domain_profile() -> Result<DomainProfile, ProfileError> {
    let bands = TierBands::new(vec![
        TierBand {
            tier: Tier::High,
            min_score: 65.0,
        },
        TierBand {
            tier: Tier::Critical,
            min_score: 85.0,
        },
    ])?;

    Ok(DomainProfile {
        name: DOMAIN.to_string(),
        table: scoring_table(),
        fallbacks: fallbacks(),
        bands,
        overrides: Vec::new(),
        factor_rules: Vec::new(),
        plan: RecommendationPlan::new(CLOSING, CLOSING_INCOMPLETE)
            .urgent(Tier::Critical, &CRITICAL_ACTIONS)
            .urgent(Tier::High, &HIGH_ACTIONS),
        checklist: checklist(),
        alert_policy: AlertPolicy::new(Tier::High, "High crowd density detected"),
    })
}
