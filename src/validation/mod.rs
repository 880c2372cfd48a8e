//! Write-time validation.
//!
//! Incoming bodies are cast field by field against the resource's
//! [`FieldSpec`]s, unknown keys are dropped, and required fields are checked.
//! Creates also fill in declared defaults. Updates are partial: only the
//! fields present in the body are cast and checked, and the store merges the
//! result into the existing document. Every stored record already satisfies
//! the rules, so a merge of a valid patch yields a valid record.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::models::{number_to_json, Document, FieldKind, FieldSpec, ResourceDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldIssue {
    Required {
        path: &'static str,
    },
    Cast {
        path: &'static str,
        kind: FieldKind,
        value: String,
    },
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Required { path } => write!(f, "{path}: Path `{path}` is required."),
            FieldIssue::Cast { path, kind, value } => write!(
                f,
                "{path}: Cast to {} failed for value {value} at path \"{path}\"",
                kind.name()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{resource} validation failed: request body must be a JSON object")]
    NotAnObject { resource: &'static str },

    #[error("{resource} validation failed: {}", join_issues(.issues))]
    Fields {
        resource: &'static str,
        issues: Vec<FieldIssue>,
    },
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Casts a create body, applies defaults and checks every required field.
pub fn validate_create(
    resource: &'static ResourceDescriptor,
    body: Value,
) -> Result<Document, ValidationError> {
    let (mut document, mut issues) = cast_body(resource, body)?;

    for field in resource.fields {
        if let Some(default) = field.default {
            if !document.contains_key(field.name) {
                document.insert(field.name.to_string(), default.to_json());
            }
        }
        let already_reported = issues.iter().any(|issue| issue_path(issue) == field.name);
        if field.required && !already_reported && is_blank(document.get(field.name)) {
            issues.push(FieldIssue::Required { path: field.name });
        }
    }

    finish(resource, document, issues)
}

/// Casts a partial update body. Required fields may be omitted but not
/// blanked.
pub fn validate_update(
    resource: &'static ResourceDescriptor,
    body: Value,
) -> Result<Document, ValidationError> {
    let (document, mut issues) = cast_body(resource, body)?;

    for field in resource.fields.iter().filter(|field| field.required) {
        if let Some(value) = document.get(field.name) {
            if is_blank(Some(value)) {
                issues.push(FieldIssue::Required { path: field.name });
            }
        }
    }

    finish(resource, document, issues)
}

fn finish(
    resource: &'static ResourceDescriptor,
    document: Document,
    issues: Vec<FieldIssue>,
) -> Result<Document, ValidationError> {
    if issues.is_empty() {
        Ok(document)
    } else {
        Err(ValidationError::Fields {
            resource: resource.singular,
            issues,
        })
    }
}

fn cast_body(
    resource: &'static ResourceDescriptor,
    body: Value,
) -> Result<(Document, Vec<FieldIssue>), ValidationError> {
    let Value::Object(raw) = body else {
        return Err(ValidationError::NotAnObject {
            resource: resource.singular,
        });
    };

    let mut document = Document::new();
    let mut issues = Vec::new();

    // Walk the declared fields so unknown and store-managed keys are dropped.
    for field in resource.fields {
        let Some(value) = raw.get(field.name) else {
            continue;
        };
        match cast_value(field, value) {
            Ok(cast) => {
                document.insert(field.name.to_string(), cast);
            }
            Err(issue) => issues.push(issue),
        }
    }

    Ok((document, issues))
}

fn cast_value(field: &FieldSpec, value: &Value) -> Result<Value, FieldIssue> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let cast = match field.kind {
        FieldKind::String => cast_string(value),
        FieldKind::Number => cast_number(value),
        FieldKind::Date => cast_date(value),
    };

    cast.ok_or_else(|| FieldIssue::Cast {
        path: field.name,
        kind: field.kind,
        value: value.to_string(),
    })
}

fn cast_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn cast_number(value: &Value) -> Option<Value> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) if s.trim().is_empty() => return Some(Value::Null),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| number_to_json(n))
}

/// Naive timestamp layouts, all taken as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn cast_date(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::String(s) => parse_date(s)?,
        Value::Number(n) => DateTime::<Utc>::from_timestamp_millis(epoch_millis(n)?)?,
        _ => return None,
    };
    // Stored dates must stay in the four-digit-year RFC 3339 form so both
    // backends can read them back and sort them.
    (0..=9999)
        .contains(&parsed.year())
        .then(|| Value::String(format_date(&parsed)))
}

fn epoch_millis(n: &serde_json::Number) -> Option<i64> {
    if let Some(millis) = n.as_i64() {
        return Some(millis);
    }
    let millis = n.as_f64()?;
    (millis.fract() == 0.0 && millis.abs() < 9.0e15).then_some(millis as i64)
}

/// Parses the date forms accepted on input: RFC 3339, naive
/// `YYYY-MM-DD[T| ]HH:MM[:SS[.fff]]` (taken as UTC) and plain `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical stored form: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn issue_path(issue: &FieldIssue) -> &'static str {
    match issue {
        FieldIssue::Required { path } | FieldIssue::Cast { path, .. } => *path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ACTIVITY, EVENT, VOLUNTEER};
    use serde_json::json;

    #[test]
    fn test_create_applies_defaults() {
        let doc = validate_create(&VOLUNTEER, json!({"name": "Asha", "email": "asha@example.org"}))
            .expect("valid volunteer");

        assert_eq!(doc["hoursCompleted"], json!(0));
        assert_eq!(doc["status"], json!("Active"));
        assert!(!doc.contains_key("phone"));
    }

    #[test]
    fn test_create_keeps_supplied_status() {
        let doc = validate_create(
            &EVENT,
            json!({"name": "Camp", "date": "2024-03-01", "location": "Pune", "status": "Done"}),
        )
        .expect("valid event");

        assert_eq!(doc["status"], json!("Done"));
        assert_eq!(doc["date"], json!("2024-03-01T00:00:00.000Z"));
    }

    #[test]
    fn test_create_reports_every_missing_field() {
        let err = validate_create(&ACTIVITY, json!({"description": "tree planting"}))
            .expect_err("missing required fields");

        match &err {
            ValidationError::Fields { resource, issues } => {
                assert_eq!(*resource, "Activity");
                assert_eq!(
                    issues,
                    &vec![
                        FieldIssue::Required { path: "name" },
                        FieldIssue::Required { path: "date" },
                        FieldIssue::Required { path: "hours" },
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Activity validation failed: name: Path `name` is required., \
             date: Path `date` is required., hours: Path `hours` is required."
        );
    }

    #[test]
    fn test_empty_string_fails_required() {
        let err = validate_create(&VOLUNTEER, json!({"name": "", "email": "a@b.c"}))
            .expect_err("blank name");

        assert!(err.to_string().contains("Path `name` is required."));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        let err = validate_create(&EVENT, json!(["not", "an", "object"])).expect_err("array body");

        assert_eq!(
            err,
            ValidationError::NotAnObject { resource: "Event" }
        );
    }

    #[test]
    fn test_unknown_and_managed_keys_are_dropped() {
        let doc = validate_create(
            &VOLUNTEER,
            json!({
                "_id": "abc",
                "createdAt": "2020-01-01",
                "name": "Ravi",
                "email": "ravi@example.org",
                "favouriteColour": "green"
            }),
        )
        .expect("valid volunteer");

        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("createdAt"));
        assert!(!doc.contains_key("favouriteColour"));
    }

    #[test]
    fn test_number_casting() {
        let doc = validate_create(
            &ACTIVITY,
            json!({"name": "Drive", "date": "2024-01-05", "hours": " 3.5 "}),
        )
        .expect("numeric string casts");
        assert_eq!(doc["hours"], json!(3.5));

        let err = validate_create(
            &ACTIVITY,
            json!({"name": "Drive", "date": "2024-01-05", "hours": "three"}),
        )
        .expect_err("non-numeric hours");
        assert_eq!(
            err.to_string(),
            "Activity validation failed: hours: Cast to number failed for value \"three\" at path \"hours\""
        );
    }

    #[test]
    fn test_empty_number_string_counts_as_missing() {
        let err = validate_create(
            &ACTIVITY,
            json!({"name": "Drive", "date": "2024-01-05", "hours": ""}),
        )
        .expect_err("blank hours");

        assert!(err.to_string().contains("Path `hours` is required."));
    }

    #[test]
    fn test_string_fields_accept_scalars() {
        let doc = validate_create(
            &VOLUNTEER,
            json!({"name": "Meera", "email": "m@example.org", "phone": 9876543210u64}),
        )
        .expect("number phone casts to string");
        assert_eq!(doc["phone"], json!("9876543210"));

        let err = validate_create(
            &VOLUNTEER,
            json!({"name": {"first": "Meera"}, "email": "m@example.org"}),
        )
        .expect_err("object name");
        assert!(err.to_string().contains("Cast to string failed"));
        assert!(!err.to_string().contains("Path `name` is required."));
    }

    #[test]
    fn test_date_forms() {
        let rfc = parse_date("2024-02-10T08:30:00+05:30").expect("rfc3339");
        assert_eq!(format_date(&rfc), "2024-02-10T03:00:00.000Z");

        let naive = parse_date("2024-02-10T08:30:00.250").expect("naive");
        assert_eq!(format_date(&naive), "2024-02-10T08:30:00.250Z");

        assert!(parse_date("10/02/2024").is_none());

        let doc = validate_create(
            &EVENT,
            json!({"name": "Camp", "date": 0, "location": "Delhi"}),
        )
        .expect("epoch millis");
        assert_eq!(doc["date"], json!("1970-01-01T00:00:00.000Z"));

        let minutes = parse_date("2024-02-10T08:30").expect("datetime-local");
        assert_eq!(format_date(&minutes), "2024-02-10T08:30:00.000Z");

        let spaced = parse_date("2024-02-10 08:30:15").expect("space separated");
        assert_eq!(format_date(&spaced), "2024-02-10T08:30:15.000Z");

        let spaced_minutes = parse_date("2024-02-10 08:30").expect("space separated minutes");
        assert_eq!(format_date(&spaced_minutes), "2024-02-10T08:30:00.000Z");

        let doc = validate_create(
            &EVENT,
            json!({"name": "Camp", "date": 1700000000000.0, "location": "Delhi"}),
        )
        .expect("whole float epoch millis");
        assert_eq!(doc["date"], json!("2023-11-14T22:13:20.000Z"));

        let err = validate_create(
            &EVENT,
            json!({"name": "Camp", "date": 1700000000000.5, "location": "Delhi"}),
        )
        .expect_err("fractional epoch millis");
        assert!(err.to_string().contains("Cast to date failed"));
    }

    #[test]
    fn test_dates_beyond_four_digit_years_are_rejected() {
        let err = validate_create(
            &EVENT,
            json!({"name": "Far", "date": 8000000000000000i64, "location": "Delhi"}),
        )
        .expect_err("year past 9999");
        assert_eq!(
            err.to_string(),
            "Event validation failed: date: Cast to date failed for value 8000000000000000 at path \"date\""
        );

        let doc = validate_create(
            &EVENT,
            json!({"name": "Edge", "date": "9999-12-31T23:59:59Z", "location": "Delhi"}),
        )
        .expect("last four-digit year");
        assert_eq!(doc["date"], json!("9999-12-31T23:59:59.000Z"));

        let err = validate_update(&ACTIVITY, json!({"date": -70000000000000000i64}))
            .expect_err("year before 0");
        assert!(err.to_string().contains("Cast to date failed"));
    }

    #[test]
    fn test_update_allows_partial_bodies() {
        let doc = validate_update(&EVENT, json!({"location": "Nagpur"})).expect("partial");

        assert_eq!(doc.len(), 1);
        assert_eq!(doc["location"], json!("Nagpur"));
    }

    #[test]
    fn test_update_does_not_apply_defaults() {
        let doc = validate_update(&VOLUNTEER, json!({"phone": "123"})).expect("partial");

        assert!(!doc.contains_key("status"));
        assert!(!doc.contains_key("hoursCompleted"));
    }

    #[test]
    fn test_update_rejects_blanked_required_field() {
        let err = validate_update(&VOLUNTEER, json!({"email": null})).expect_err("null email");
        assert!(err.to_string().contains("Path `email` is required."));

        let doc = validate_update(&VOLUNTEER, json!({"phone": null})).expect("optional cleared");
        assert_eq!(doc["phone"], Value::Null);
    }
}
