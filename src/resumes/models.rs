// src/resumes/models.rs

use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

use crate::common::helpers::{serialize_json_column, serialize_string_list};

// ============================================================================
// Resume Models
// ============================================================================

/// The resume aggregate: file identity, the structured fields produced by
/// the extraction task, and the analytics envelope.
#[derive(FromRow, Serialize, Debug)]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    #[serde(skip_serializing)]
    pub file_location: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub cgpa: Option<f64>,
    pub twelfth_percent: Option<f64>,
    pub tenth_percent: Option<f64>,
    pub backlogs: Option<i64>,
    pub experience_years: Option<i64>,
    pub desired_role: Option<String>,
    pub communication_rating: Option<i64>,
    #[serde(serialize_with = "serialize_string_list")]
    pub skills: Option<String>,
    #[serde(serialize_with = "serialize_string_list")]
    pub projects: Option<String>,
    #[serde(serialize_with = "serialize_string_list")]
    pub certifications: Option<String>,
    pub hackathon: Option<String>,
    #[serde(serialize_with = "serialize_json_column")]
    pub internships: Option<String>,
    #[serde(skip_serializing)]
    pub extracted_text: Option<String>,
    pub analytics_status: String,
    #[serde(serialize_with = "serialize_json_column")]
    pub ats_evaluation: Option<String>,
    #[serde(serialize_with = "serialize_json_column")]
    pub career_roadmap: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(FromRow, Serialize, Debug)]
pub struct ResumeListItem {
    pub id: String,
    pub filename: String,
    pub name: Option<String>,
    pub desired_role: Option<String>,
    pub analytics_status: String,
    pub created_at: String,
}

// ============================================================================
// Extraction Output
// ============================================================================

/// Column-shaped view of the extraction task's JSON output. Conversions are
/// lenient: a missing or wrongly typed field becomes NULL, never an error.
/// The emptiness guard already ran inside the extraction task.
#[derive(Debug, Default, Clone)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub cgpa: Option<f64>,
    pub twelfth_percent: Option<f64>,
    pub tenth_percent: Option<f64>,
    pub backlogs: Option<i64>,
    pub experience_years: Option<i64>,
    pub desired_role: Option<String>,
    pub communication_rating: Option<i64>,
    pub skills: Option<String>,
    pub projects: Option<String>,
    pub certifications: Option<String>,
    pub hackathon: Option<String>,
    pub internships: Option<String>,
}

impl ExtractedFields {
    pub fn from_value(parsed: &Value) -> Self {
        Self {
            name: string_field(parsed, "name"),
            email: string_field(parsed, "email"),
            phone: string_field(parsed, "phone"),
            linkedin: string_field(parsed, "linkedin"),
            github: string_field(parsed, "github"),
            cgpa: number_field(parsed, "cgpa"),
            twelfth_percent: number_field(parsed, "twelfth_percent"),
            tenth_percent: number_field(parsed, "tenth_percent"),
            backlogs: integer_field(parsed, "backlogs"),
            // The prompt schema uses camelCase for this one field.
            experience_years: integer_field(parsed, "experienceYears"),
            desired_role: string_field(parsed, "desired_role"),
            communication_rating: integer_field(parsed, "communication_rating"),
            skills: json_text_field(parsed, "skills"),
            projects: json_text_field(parsed, "projects"),
            certifications: json_text_field(parsed, "certifications"),
            hackathon: string_field(parsed, "hackathon"),
            internships: json_text_field(parsed, "internships"),
        }
    }
}

fn string_field(parsed: &Value, key: &str) -> Option<String> {
    parsed
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_field(parsed: &Value, key: &str) -> Option<f64> {
    parsed.get(key).and_then(Value::as_f64)
}

fn integer_field(parsed: &Value, key: &str) -> Option<i64> {
    let value = parsed.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

/// Stores arrays/objects as their JSON text; null and scalars become NULL.
fn json_text_field(parsed: &Value, key: &str) -> Option<String> {
    match parsed.get(key) {
        Some(value @ (Value::Array(_) | Value::Object(_))) => Some(value.to_string()),
        _ => None,
    }
}
