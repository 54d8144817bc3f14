//! Crowd-density assessments for monitored sites.

pub mod profile;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::assessments::{AssessmentRepository, AssessmentService, MonitorHandle};
use crate::engine::{
    AcquireError, Assessment, GeoPosition, MotionVector, ScheduledEvent, SignalProvider,
    SignalValue, SourceId, SubjectId, VenueOccupancy, WeatherReading,
};

/// Latest collaborator readings for one site. Absent readings fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdReadings {
    pub position: Option<GeoPosition>,
    pub weather: Option<WeatherReading>,
    pub venues: Option<Vec<VenueOccupancy>>,
    pub events: Option<Vec<ScheduledEvent>>,
    pub nearby_devices: Option<u32>,
    pub motion: Option<MotionVector>,
}

impl CrowdReadings {
    /// Overlay every reading present in `update`.
    pub fn merge(&mut self, update: &CrowdReadings) {
        fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        overlay(&mut self.position, &update.position);
        overlay(&mut self.weather, &update.weather);
        overlay(&mut self.venues, &update.venues);
        overlay(&mut self.events, &update.events);
        overlay(&mut self.nearby_devices, &update.nearby_devices);
        overlay(&mut self.motion, &update.motion);
    }
}

#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: Mutex<HashMap<SubjectId, CrowdReadings>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sites(&self) -> MutexGuard<'_, HashMap<SubjectId, CrowdReadings>> {
        self.sites.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, site: &SubjectId, update: &CrowdReadings) -> CrowdReadings {
        let mut sites = self.sites();
        let readings = sites.entry(site.clone()).or_default();
        readings.merge(update);
        readings.clone()
    }

    pub fn snapshot(&self, site: &SubjectId) -> CrowdReadings {
        self.sites().get(site).cloned().unwrap_or_default()
    }
}

/// Signal provider reading from one snapshot of a site's readings.
#[derive(Debug, Clone)]
pub struct SiteFeed {
    readings: CrowdReadings,
}

impl SiteFeed {
    pub fn new(readings: CrowdReadings) -> Self {
        Self { readings }
    }
}

#[async_trait]
impl SignalProvider for SiteFeed {
    async fn fetch(&self, source: &SourceId) -> Result<SignalValue, AcquireError> {
        let r = &self.readings;
        let reading = match source.as_str() {
            profile::POSITION => r.position.map(SignalValue::Position),
            profile::WEATHER => r.weather.clone().map(SignalValue::Weather),
            profile::VENUES => r.venues.clone().map(SignalValue::Venues),
            profile::EVENTS => r.events.clone().map(SignalValue::Events),
            profile::NEARBY_DEVICES => r
                .nearby_devices
                .map(|count| SignalValue::Number(f64::from(count))),
            profile::MOTION => r.motion.map(SignalValue::Motion),
            other => {
                return Err(AcquireError::Unavailable(format!(
                    "unknown site reading `{other}`"
                )))
            }
        };
        reading.ok_or(AcquireError::Absent)
    }
}

/// Site registry wired to the crowd assessment service.
pub struct CrowdWorkflow<R> {
    registry: Arc<SiteRegistry>,
    service: Arc<AssessmentService<R>>,
}

impl<R> CrowdWorkflow<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(registry: Arc<SiteRegistry>, service: Arc<AssessmentService<R>>) -> Self {
        Self { registry, service }
    }

    pub fn registry(&self) -> &Arc<SiteRegistry> {
        &self.registry
    }

    pub fn service(&self) -> &Arc<AssessmentService<R>> {
        &self.service
    }

    pub fn update_readings(&self, site: &SubjectId, update: &CrowdReadings) -> CrowdReadings {
        self.registry.update(site, update)
    }

    pub async fn assess(&self, site: &SubjectId) -> Assessment {
        let registry = Arc::clone(&self.registry);
        self.service
            .recompute_with(site, || SiteFeed::new(registry.snapshot(site)))
            .await
    }

    /// Periodically reassess `site` until the handle is stopped.
    pub fn monitor(&self, site: SubjectId, interval: Duration) -> MonitorHandle {
        let registry = Arc::clone(&self.registry);
        let target = site.clone();
        self.service
            .monitor(site, interval, move || SiteFeed::new(registry.snapshot(&target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_readings_missing_from_update() {
        let mut readings = CrowdReadings {
            nearby_devices: Some(3),
            motion: Some(MotionVector {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            }),
            ..CrowdReadings::default()
        };
        readings.merge(&CrowdReadings {
            nearby_devices: Some(7),
            ..CrowdReadings::default()
        });

        assert_eq!(readings.nearby_devices, Some(7));
        assert!(readings.motion.is_some());
    }

    #[tokio::test]
    async fn feed_reports_missing_readings_as_absent() {
        let feed = SiteFeed::new(CrowdReadings {
            nearby_devices: Some(2),
            ..CrowdReadings::default()
        });

        assert_eq!(
            feed.fetch(&SourceId::new(profile::NEARBY_DEVICES)).await,
            Ok(SignalValue::Number(2.0))
        );
        assert_eq!(
            feed.fetch(&SourceId::new(profile::WEATHER)).await,
            Err(AcquireError::Absent)
        );
        assert!(matches!(
            feed.fetch(&SourceId::new("sound_level")).await,
            Err(AcquireError::Unavailable(_))
        ));
    }
}
