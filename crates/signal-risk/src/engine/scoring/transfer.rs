use chrono::{DateTime, Duration, Utc};

use super::super::signal::{SignalValue, WeatherReading};

/// Lower-exclusive step used by [`TransferFunction::Banded`].
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub above: f64,
    pub partial: f64,
}

/// Maps a weather reading to the multiplier applied to a crowd base weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherCrowdFactor {
    pub base: f64,
    pub favorable: f64,
    pub neutral: f64,
    pub adverse: f64,
    pub mild_low: f64,
    pub mild_high: f64,
    pub cold_below: f64,
    pub hot_above: f64,
}

impl Default for WeatherCrowdFactor {
    fn default() -> Self {
        Self {
            base: 20.0,
            favorable: 1.5,
            neutral: 1.0,
            adverse: 0.6,
            mild_low: 20.0,
            mild_high: 28.0,
            cold_below: 5.0,
            hot_above: 35.0,
        }
    }
}

impl WeatherCrowdFactor {
    pub fn multiplier(&self, reading: &WeatherReading) -> f64 {
        let raining = reading.condition.to_ascii_lowercase().contains("rain");
        let temperature = reading.temperature;

        if (self.mild_low..=self.mild_high).contains(&temperature) && !raining {
            self.favorable
        } else if raining || temperature < self.cold_below || temperature > self.hot_above {
            self.adverse
        } else {
            self.neutral
        }
    }
}

/// Named mapping from a raw reading to a non-negative partial contribution.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferFunction {
    /// Tracked for completeness and provenance only; never scores.
    Informational,
    /// First band whose `above` is strictly exceeded wins; bands are listed highest first.
    Banded { bands: Vec<Band>, otherwise: f64 },
    Above { threshold: f64, partial: f64 },
    Below { threshold: f64, partial: f64 },
    OutsideRange {
        low: f64,
        low_partial: f64,
        high: f64,
        high_partial: f64,
    },
    Flag { partial: f64 },
    /// Case-insensitive label equality.
    LabelMatch { label: String, partial: f64 },
    Linear { per_unit: f64, cap: f64 },
    /// Euclidean norm of a motion vector times `scale`, capped.
    MotionMagnitude { scale: f64, cap: f64 },
    WeatherFactor(WeatherCrowdFactor),
    /// Mean venue occupancy (clamped to 0-100) times `scale`.
    VenueOccupancy { scale: f64 },
    /// Occupancy ratio times `per_event` for every event starting within
    /// `window` of the evaluation instant (either side), capped.
    EventOccupancy {
        per_event: f64,
        window: Duration,
        cap: f64,
    },
}

impl TransferFunction {
    pub fn apply(&self, value: &SignalValue, at: DateTime<Utc>) -> f64 {
        let partial = match self {
            TransferFunction::Informational => 0.0,
            TransferFunction::Banded { bands, otherwise } => match value.as_number() {
                Some(number) => bands
                    .iter()
                    .find(|band| number > band.above)
                    .map(|band| band.partial)
                    .unwrap_or(*otherwise),
                None => *otherwise,
            },
            TransferFunction::Above { threshold, partial } => match value.as_number() {
                Some(number) if number > *threshold => *partial,
                _ => 0.0,
            },
            TransferFunction::Below { threshold, partial } => match value.as_number() {
                Some(number) if number < *threshold => *partial,
                _ => 0.0,
            },
            TransferFunction::OutsideRange {
                low,
                low_partial,
                high,
                high_partial,
            } => match value.as_number() {
                Some(number) if number > *high => *high_partial,
                Some(number) if number < *low => *low_partial,
                _ => 0.0,
            },
            TransferFunction::Flag { partial } => match value.as_flag() {
                Some(true) => *partial,
                _ => 0.0,
            },
            TransferFunction::LabelMatch { label, partial } => match value.as_label() {
                Some(found) if found.trim().eq_ignore_ascii_case(label) => *partial,
                _ => 0.0,
            },
            TransferFunction::Linear { per_unit, cap } => value
                .as_number()
                .map(|number| (number.max(0.0) * per_unit).min(*cap))
                .unwrap_or(0.0),
            TransferFunction::MotionMagnitude { scale, cap } => match value {
                SignalValue::Motion(vector) => {
                    let magnitude = vector.magnitude();
                    if magnitude.is_finite() {
                        (magnitude * scale).min(*cap)
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            },
            TransferFunction::WeatherFactor(factor) => match value {
                SignalValue::Weather(reading) => factor.base * factor.multiplier(reading),
                _ => 0.0,
            },
            TransferFunction::VenueOccupancy { scale } => match value {
                SignalValue::Venues(venues) if !venues.is_empty() => {
                    let total: f64 = venues
                        .iter()
                        .map(|venue| {
                            if venue.occupancy_estimate.is_finite() {
                                venue.occupancy_estimate.clamp(0.0, 100.0)
                            } else {
                                0.0
                            }
                        })
                        .sum();
                    (total / venues.len() as f64) * scale
                }
                _ => 0.0,
            },
            TransferFunction::EventOccupancy {
                per_event,
                window,
                cap,
            } => match value {
                SignalValue::Events(events) => {
                    let boost: f64 = events
                        .iter()
                        .filter(|event| within_window(event.starts_at, at, *window))
                        .map(|event| event.occupancy_ratio() * per_event)
                        .sum();
                    boost.min(*cap)
                }
                _ => 0.0,
            },
        };

        if partial.is_finite() {
            partial.max(0.0)
        } else {
            0.0
        }
    }
}

fn within_window(starts_at: DateTime<Utc>, at: DateTime<Utc>, window: Duration) -> bool {
    let distance = if starts_at >= at {
        starts_at - at
    } else {
        at - starts_at
    };
    distance <= window
}
