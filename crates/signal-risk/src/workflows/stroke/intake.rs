//! Lenient intake of manual JSON updates. A member with the wrong type is rejected
//! on its own; the rest of the update still applies.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::domain::{ActivitySample, FieldRejection, StrokeProfile};

/// Typed update plus the members that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Intake<T> {
    pub update: T,
    pub rejected: Vec<FieldRejection>,
}

/// Read a nested profile update such as `{"demographics": {"age": 61}}`.
pub fn profile_update(body: Value) -> Intake<StrokeProfile> {
    let mut rejected = Vec::new();
    let mut kept = Map::new();

    for (section, value) in members(body, &mut rejected) {
        match value {
            Value::Object(fields) => {
                let mut kept_fields = Map::new();
                for (field, value) in fields {
                    let candidate = wrap(&section, wrap(&field, value.clone()));
                    match serde_json::from_value::<StrokeProfile>(candidate) {
                        Ok(_) => {
                            kept_fields.insert(field, value);
                        }
                        Err(error) => {
                            let path = format!("{section}.{field}");
                            rejected.push(type_rejection(&path, &value, &error));
                        }
                    }
                }
                kept.insert(section, Value::Object(kept_fields));
            }
            other => keep_if_readable::<StrokeProfile>(&mut kept, section, other, &mut rejected),
        }
    }

    finish(kept, rejected)
}

/// Read a flat wearable sample such as `{"step_delta": 500, "sleep_hours": 6.5}`.
pub fn activity_sample(body: Value) -> Intake<ActivitySample> {
    let mut rejected = Vec::new();
    let mut kept = Map::new();

    for (field, value) in members(body, &mut rejected) {
        keep_if_readable::<ActivitySample>(&mut kept, field, value, &mut rejected);
    }

    finish(kept, rejected)
}

fn members(body: Value, rejected: &mut Vec<FieldRejection>) -> Map<String, Value> {
    match body {
        Value::Object(members) => members,
        Value::Null => Map::new(),
        other => {
            rejected.push(FieldRejection {
                field: "body".to_string(),
                value: other.to_string(),
                reason: "must be a JSON object".to_string(),
            });
            Map::new()
        }
    }
}

fn keep_if_readable<T: DeserializeOwned>(
    kept: &mut Map<String, Value>,
    name: String,
    value: Value,
    rejected: &mut Vec<FieldRejection>,
) {
    match serde_json::from_value::<T>(wrap(&name, value.clone())) {
        Ok(_) => {
            kept.insert(name, value);
        }
        Err(error) => rejected.push(type_rejection(&name, &value, &error)),
    }
}

fn finish<T: DeserializeOwned + Default>(
    kept: Map<String, Value>,
    mut rejected: Vec<FieldRejection>,
) -> Intake<T> {
    let update = match serde_json::from_value::<T>(Value::Object(kept)) {
        Ok(update) => update,
        Err(error) => {
            rejected.push(FieldRejection {
                field: "body".to_string(),
                value: String::new(),
                reason: error.to_string(),
            });
            T::default()
        }
    };

    Intake { update, rejected }
}

fn wrap(name: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(name.to_string(), value);
    Value::Object(object)
}

fn type_rejection(field: &str, value: &Value, error: &serde_json::Error) -> FieldRejection {
    FieldRejection {
        field: field.to_string(),
        value: value.to_string(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mistyped_member_is_rejected_alone() {
        let intake = profile_update(json!({
            "demographics": { "age": "abc", "gender": "female" },
            "vital_signs": { "systolic_bp": 150 },
            "symptoms": "none"
        }));

        assert_eq!(intake.update.demographics.age, None);
        assert_eq!(intake.update.demographics.gender.as_deref(), Some("female"));
        assert_eq!(intake.update.vital_signs.systolic_bp, Some(150.0));

        let fields: Vec<&str> = intake.rejected.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["demographics.age", "symptoms"]);
        assert_eq!(intake.rejected[0].value, "\"abc\"");
    }

    #[test]
    fn negative_step_delta_is_rejected() {
        let intake = activity_sample(json!({ "step_delta": -20, "sleep_hours": 6.5 }));

        assert_eq!(intake.update.step_delta, None);
        assert_eq!(intake.update.sleep_hours, Some(6.5));
        assert_eq!(intake.rejected.len(), 1);
        assert_eq!(intake.rejected[0].field, "step_delta");
    }

    #[test]
    fn non_object_body_rejects_everything() {
        let intake = activity_sample(json!([1, 2, 3]));
        assert_eq!(intake.update, ActivitySample::default());
        assert_eq!(intake.rejected[0].field, "body");
    }
}
