use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{
    Demographics, FieldRejection, HistoricalRecord, LabResults, MedicalHistory, StrokeProfile,
    VitalSigns,
};
use super::intake::Intake;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read patient export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid patient CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Fold a CSV export into a single update. Rows are ordered oldest first, so for
/// each field the last row that populates it with a readable value wins; unreadable
/// cells are reported and leave the earlier value in place.
pub fn parse_reader<R: Read>(reader: R) -> Result<Intake<StrokeProfile>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut update = StrokeProfile::default();
    let mut rejected = Vec::new();
    for (index, record) in csv_reader.deserialize::<PatientRow>().enumerate() {
        let row = record?;
        let mut cells = Cells {
            row: index + 1,
            rejected: &mut rejected,
        };
        row.apply(&mut update, &mut cells);
    }

    Ok(Intake { update, rejected })
}

pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<Intake<StrokeProfile>, ImportError> {
    let file = std::fs::File::open(path)?;
    parse_reader(file)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PatientRow {
    #[serde(deserialize_with = "text_cell")]
    age: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    gender: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    ethnicity: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    hypertension: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    diabetes: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    heart_disease: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    stroke_history: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    smoking_status: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    systolic_bp: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    diastolic_bp: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    heart_rate: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    temperature: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    oxygen_saturation: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    cholesterol: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    glucose: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    bmi: Option<String>,
    #[serde(deserialize_with = "text_cell")]
    family_history: Option<String>,
}

impl PatientRow {
    fn apply(self, update: &mut StrokeProfile, cells: &mut Cells<'_>) {
        let StrokeProfile {
            demographics,
            medical_history,
            vital_signs,
            lab_results,
            history,
            ..
        } = update;

        let Demographics {
            age,
            gender,
            ethnicity,
        } = demographics;
        overlay(age, cells.number("age", self.age));
        overlay(gender, self.gender);
        overlay(ethnicity, self.ethnicity);

        let MedicalHistory {
            hypertension,
            diabetes,
            heart_disease,
            stroke_history,
            smoking_status,
        } = medical_history;
        overlay(hypertension, cells.flag("hypertension", self.hypertension));
        overlay(diabetes, cells.flag("diabetes", self.diabetes));
        overlay(heart_disease, cells.flag("heart_disease", self.heart_disease));
        overlay(stroke_history, cells.flag("stroke_history", self.stroke_history));
        overlay(smoking_status, self.smoking_status);

        let VitalSigns {
            systolic_bp,
            diastolic_bp,
            heart_rate,
            temperature,
            oxygen_saturation,
        } = vital_signs;
        overlay(systolic_bp, cells.number("systolic_bp", self.systolic_bp));
        overlay(diastolic_bp, cells.number("diastolic_bp", self.diastolic_bp));
        overlay(heart_rate, cells.number("heart_rate", self.heart_rate));
        overlay(temperature, cells.number("temperature", self.temperature));
        overlay(
            oxygen_saturation,
            cells.number("oxygen_saturation", self.oxygen_saturation),
        );

        let LabResults {
            cholesterol,
            glucose,
        } = lab_results;
        overlay(cholesterol, cells.number("cholesterol", self.cholesterol));
        overlay(glucose, cells.number("glucose", self.glucose));

        let HistoricalRecord {
            bmi,
            family_history,
        } = history;
        overlay(bmi, cells.number("bmi", self.bmi));
        overlay(family_history, self.family_history);
    }
}

/// Typed reading of one row's cells; unreadable cells become rejections.
struct Cells<'a> {
    row: usize,
    rejected: &'a mut Vec<FieldRejection>,
}

impl Cells<'_> {
    fn reject(&mut self, field: &str, value: String, expected: &str) {
        self.rejected.push(FieldRejection {
            field: field.to_string(),
            value,
            reason: format!("row {}: expected {expected}", self.row),
        });
    }

    fn number(&mut self, field: &str, cell: Option<String>) -> Option<f64> {
        let cell = cell?;
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                self.reject(field, cell, "a number");
                None
            }
        }
    }

    fn flag(&mut self, field: &str, cell: Option<String>) -> Option<bool> {
        let cell = cell?;
        match cell.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => {
                self.reject(field, cell, "true/false, 1/0 or yes/no");
                None
            }
        }
    }
}

fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn text_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_rows_win_per_field() {
        let csv = "\
age,gender,hypertension,systolic_bp,bmi,family_history
52,male,no,150,,none
,,yes,,31.5,
60,,,,,stroke
";
        let Intake { update, rejected } = parse_reader(csv.as_bytes()).expect("csv parses");
        assert!(rejected.is_empty());
        assert_eq!(update.demographics.age, Some(60.0));
        assert_eq!(update.demographics.gender.as_deref(), Some("male"));
        assert_eq!(update.medical_history.hypertension, Some(true));
        assert_eq!(update.vital_signs.systolic_bp, Some(150.0));
        assert_eq!(update.history.bmi, Some(31.5));
        assert_eq!(update.history.family_history.as_deref(), Some("stroke"));
    }

    #[test]
    fn unreadable_cells_are_rejected_and_keep_the_earlier_row() {
        let csv = "\
hypertension,glucose,heart_disease
yes,110,
unknown,high,1
";
        let Intake { update, rejected } = parse_reader(csv.as_bytes()).expect("csv parses");

        assert_eq!(update.medical_history.hypertension, Some(true));
        assert_eq!(update.lab_results.glucose, Some(110.0));
        assert_eq!(update.medical_history.heart_disease, Some(true));

        let fields: Vec<(&str, &str)> = rejected
            .iter()
            .map(|r| (r.field.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(fields, vec![("hypertension", "unknown"), ("glucose", "high")]);
        assert!(rejected[0].reason.starts_with("row 2"));
    }

    #[test]
    fn explicit_negatives_clear_flags() {
        let csv = "diabetes,stroke_history\nNo,0\n";
        let Intake { update, rejected } = parse_reader(csv.as_bytes()).expect("csv parses");
        assert!(rejected.is_empty());
        assert_eq!(update.medical_history.diabetes, Some(false));
        assert_eq!(update.medical_history.stroke_history, Some(false));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let error = parse_path("/definitely/not/here.csv").expect_err("missing file");
        assert!(matches!(error, ImportError::Io(_)));
    }
}
