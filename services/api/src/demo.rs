use crate::infra::{build_api, Api};
use clap::Args;
use signal_risk::config::{AppConfig, EngineConfig};
use signal_risk::engine::{
    Alert, Assessment, GeoPosition, MotionVector, ScoreRecord, SubjectId, WeatherReading,
};
use signal_risk::error::AppError;
use signal_risk::workflows::crowd::CrowdReadings;
use signal_risk::workflows::stroke::{
    Demographics, FieldRejection, MedicalHistory, StrokeProfile, Symptoms, VitalSigns,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Args, Debug)]
pub(crate) struct StrokeAssessArgs {
    /// Patient identifier used for the assessment and any alert
    #[arg(long, default_value = "patient-1")]
    pub(crate) patient: String,
    /// Patient CSV export to backfill the record (most recent row wins per field)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Report facial droop
    #[arg(long)]
    pub(crate) facial_droop: bool,
    /// Report arm weakness
    #[arg(long)]
    pub(crate) arm_weakness: bool,
    /// Report speech difficulty
    #[arg(long)]
    pub(crate) speech_difficulty: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CrowdMonitorArgs {
    /// Site identifier
    #[arg(long, default_value = "site-1")]
    pub(crate) site: String,
    /// Recompute interval in milliseconds (defaults to RISK_RECOMPUTE_INTERVAL_MS)
    #[arg(long)]
    pub(crate) interval_ms: Option<u64>,
    /// Number of records to print before stopping
    #[arg(long, default_value_t = 3)]
    pub(crate) ticks: usize,
    /// Bluetooth devices seen nearby; omit to use the default estimate
    #[arg(long)]
    pub(crate) devices: Option<u32>,
}

pub(crate) async fn run_stroke_assessment(args: StrokeAssessArgs) -> Result<(), AppError> {
    let StrokeAssessArgs {
        patient,
        csv,
        facial_droop,
        arm_weakness,
        speech_difficulty,
    } = args;

    let config = AppConfig::load()?;
    let api = build_api(&config.engine)?;
    let patient = SubjectId::new(patient);

    if let Some(path) = csv {
        let outcome = api.stroke().import_path(&patient, path)?;
        render_rejections(&outcome.rejected);
    }

    let symptoms = Symptoms {
        facial_droop: facial_droop.then_some(true),
        arm_weakness: arm_weakness.then_some(true),
        speech_difficulty: speech_difficulty.then_some(true),
        ..Symptoms::default()
    };
    api.stroke().update_profile(
        &patient,
        &StrokeProfile {
            symptoms,
            ..StrokeProfile::default()
        },
    );

    let assessment = api.stroke().assess(&patient).await;
    render_assessment("Stroke risk assessment", &assessment);
    Ok(())
}

pub(crate) async fn run_crowd_monitor(args: CrowdMonitorArgs) -> Result<(), AppError> {
    let CrowdMonitorArgs {
        site,
        interval_ms,
        ticks,
        devices,
    } = args;

    let config = AppConfig::load()?;
    let interval = interval_ms
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(config.engine.recompute_interval);
    let api = build_api(&config.engine)?;
    let site = SubjectId::new(site);

    api.crowd().update_readings(
        &site,
        &CrowdReadings {
            nearby_devices: devices,
            ..CrowdReadings::default()
        },
    );

    println!(
        "Monitoring {} every {} ms ({} records)",
        site,
        interval.as_millis(),
        ticks
    );

    let mut updates = api.crowd().service().subscribe();
    let handle = api.crowd().monitor(site, interval);

    let mut printed = 0;
    while printed < ticks {
        match updates.recv().await {
            Ok(record) => {
                render_record_line(&record);
                printed += 1;
            }
            Err(RecvError::Lagged(skipped)) => println!("- ({skipped} records skipped)"),
            Err(RecvError::Closed) => break,
        }
    }

    handle.stop().await;
    render_alerts(&api.alerts().all());
    Ok(())
}

pub(crate) async fn run_demo() -> Result<(), AppError> {
    let engine = EngineConfig {
        submit_latency: Duration::ZERO,
        ..EngineConfig::default()
    };
    let api = build_api(&engine)?;

    println!("Signal risk demo");
    demo_stroke(&api).await;
    demo_crowd(&api).await;

    let alerts = api.alerts().all();
    render_alerts(&alerts);

    if let Some(alert) = alerts.first() {
        let receipt = api.stroke().service().dispatcher().deliver(alert).await;
        println!("\nManual notification for {}: {}", alert.id, receipt.message());
    }

    Ok(())
}

async fn demo_stroke(api: &Api) {
    let unknown = SubjectId::new("patient-empty");
    let assessment = api.stroke().assess(&unknown).await;
    render_assessment("Stroke risk: no data on file", &assessment);

    let known = SubjectId::new("patient-hypertensive");
    let outcome = api.stroke().update_profile(
        &known,
        &StrokeProfile {
            demographics: Demographics {
                age: Some(68.0),
                gender: Some("female".to_string()),
                ..Demographics::default()
            },
            medical_history: MedicalHistory {
                hypertension: Some(true),
                smoking_status: Some("sometimes".to_string()),
                ..MedicalHistory::default()
            },
            vital_signs: VitalSigns {
                systolic_bp: Some(152.0),
                diastolic_bp: Some(94.0),
                ..VitalSigns::default()
            },
            ..StrokeProfile::default()
        },
    );
    render_rejections(&outcome.rejected);
    let assessment = api.stroke().assess(&known).await;
    render_assessment("Stroke risk: hypertensive patient", &assessment);

    api.stroke().update_profile(
        &known,
        &StrokeProfile {
            symptoms: Symptoms {
                speech_difficulty: Some(true),
                ..Symptoms::default()
            },
            ..StrokeProfile::default()
        },
    );
    let assessment = api.stroke().assess(&known).await;
    render_assessment("Stroke risk: speech difficulty reported", &assessment);
}

async fn demo_crowd(api: &Api) {
    let estimated = SubjectId::new("site-estimated");
    let assessment = api.crowd().assess(&estimated).await;
    render_assessment("Crowd density: all readings estimated", &assessment);

    let quiet = SubjectId::new("site-riverside");
    api.crowd().update_readings(
        &quiet,
        &CrowdReadings {
            position: Some(GeoPosition {
                latitude: 40.7033,
                longitude: -74.0170,
                accuracy: 8.0,
            }),
            weather: Some(WeatherReading {
                temperature: 11.0,
                condition: "light rain".to_string(),
                humidity: 88.0,
            }),
            venues: Some(Vec::new()),
            events: Some(Vec::new()),
            nearby_devices: Some(1),
            motion: Some(MotionVector {
                x: 0.1,
                y: 0.2,
                z: 0.1,
            }),
        },
    );
    let assessment = api.crowd().assess(&quiet).await;
    render_assessment("Crowd density: quiet riverside", &assessment);
}

fn render_record_line(record: &ScoreRecord) {
    println!(
        "- {} {}: score {:.1} ({}) | confidence {:.0}% | completeness {:.0}%",
        record.computed_at.format("%H:%M:%S"),
        record.subject_id,
        record.score,
        record.tier,
        record.confidence * 100.0,
        record.completeness
    );
}

fn render_assessment(title: &str, assessment: &Assessment) {
    let record = &assessment.record;
    println!("\n{title}");
    println!(
        "Score {:.1} -> {} | confidence {:.0}% | completeness {:.0}%",
        record.score,
        record.tier,
        record.confidence * 100.0,
        record.completeness
    );

    let health = &record.source_health;
    println!(
        "Sources used: real-time {} | historical {} | clinical {}",
        yes_no(health.real_time_used),
        yes_no(health.historical_used),
        yes_no(health.clinical_used)
    );

    let estimated: Vec<&str> = record
        .components
        .iter()
        .filter(|component| component.is_fallback)
        .map(|component| component.source.as_str())
        .collect();
    if !estimated.is_empty() {
        println!("Estimated inputs: {}", estimated.join(", "));
    }

    if !record.overrides.is_empty() {
        for active in &record.overrides {
            println!("Override {} (minimum {})", active.rule, active.minimum);
        }
    }

    if !record.contributing_factors.is_empty() {
        println!("Risk factors");
        for factor in &record.contributing_factors {
            println!("- {factor}");
        }
    }

    println!("Recommendations");
    for recommendation in &assessment.recommendations {
        println!("- {recommendation}");
    }

    if let Some(alert) = &assessment.alert {
        println!("Alert {} raised: {}", alert.id, alert.message);
    }
}

fn render_rejections(rejected: &[FieldRejection]) {
    for rejection in rejected {
        println!(
            "Rejected {} = {} ({}); previous value kept",
            rejection.field, rejection.value, rejection.reason
        );
    }
}

fn render_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("\nAlerts: none");
        return;
    }

    println!("\nAlert log");
    for alert in alerts {
        println!(
            "- {} [{}] {} at {}",
            alert.id,
            alert.severity,
            alert.message,
            alert.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
