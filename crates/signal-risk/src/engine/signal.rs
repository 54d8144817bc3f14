use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a named signal provider within a domain table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the patient, venue, or site a score is computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which family of collaborators a source belongs to, used for source-health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    RealTime,
    Historical,
    Clinical,
}

/// 3-axis acceleration reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionVector {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub condition: String,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// Nearby place with an estimated occupancy on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueOccupancy {
    pub name: String,
    pub rating_count: u32,
    pub occupancy_estimate: f64,
}

impl VenueOccupancy {
    /// Estimate occupancy from the venue's rating count when no live estimate exists.
    pub fn from_rating_count(name: impl Into<String>, rating_count: u32) -> Self {
        Self {
            name: name.into(),
            rating_count,
            occupancy_estimate: (f64::from(rating_count) / 10.0).min(100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: u32,
    pub sold: u32,
    pub venue: String,
}

impl ScheduledEvent {
    pub fn occupancy_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (f64::from(self.sold) / f64::from(self.capacity)).clamp(0.0, 1.0)
    }
}

/// Raw reading carried by a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignalValue {
    Number(f64),
    Flag(bool),
    Label(String),
    Motion(MotionVector),
    Weather(WeatherReading),
    Position(GeoPosition),
    Venues(Vec<VenueOccupancy>),
    Events(Vec<ScheduledEvent>),
}

/// Shape of a [`SignalValue`], declared per table entry so malformed readings can be caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Flag,
    Label,
    Motion,
    Weather,
    Position,
    Venues,
    Events,
}

impl SignalValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SignalValue::Number(_) => ValueKind::Number,
            SignalValue::Flag(_) => ValueKind::Flag,
            SignalValue::Label(_) => ValueKind::Label,
            SignalValue::Motion(_) => ValueKind::Motion,
            SignalValue::Weather(_) => ValueKind::Weather,
            SignalValue::Position(_) => ValueKind::Position,
            SignalValue::Venues(_) => ValueKind::Venues,
            SignalValue::Events(_) => ValueKind::Events,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SignalValue::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SignalValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            SignalValue::Label(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Whether the reading carries usable data (finite numbers, non-blank labels).
    /// An empty venue or event list is a valid reading of "none nearby".
    pub fn is_populated(&self) -> bool {
        match self {
            SignalValue::Number(value) => value.is_finite(),
            SignalValue::Label(value) => !value.trim().is_empty(),
            SignalValue::Flag(_)
            | SignalValue::Motion(_)
            | SignalValue::Weather(_)
            | SignalValue::Position(_)
            | SignalValue::Venues(_)
            | SignalValue::Events(_) => true,
        }
    }

    /// Every numeric component is finite. A reading failing this is malformed.
    pub fn is_finite(&self) -> bool {
        match self {
            SignalValue::Number(value) => value.is_finite(),
            SignalValue::Flag(_) | SignalValue::Label(_) | SignalValue::Events(_) => true,
            SignalValue::Motion(vector) => {
                vector.x.is_finite() && vector.y.is_finite() && vector.z.is_finite()
            }
            SignalValue::Weather(reading) => {
                reading.temperature.is_finite() && reading.humidity.is_finite()
            }
            SignalValue::Position(position) => {
                position.latitude.is_finite()
                    && position.longitude.is_finite()
                    && position.accuracy.is_finite()
            }
            SignalValue::Venues(venues) => venues
                .iter()
                .all(|venue| venue.occupancy_estimate.is_finite()),
        }
    }

    /// Populated and non-empty. Completeness counts only readings with actual content.
    pub fn has_content(&self) -> bool {
        match self {
            SignalValue::Venues(venues) => !venues.is_empty(),
            SignalValue::Events(events) => !events.is_empty(),
            other => other.is_populated(),
        }
    }
}

/// A single typed reading with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source_id: SourceId,
    pub value: SignalValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub weight: f64,
    pub is_fallback: bool,
    pub captured_at: DateTime<Utc>,
}
