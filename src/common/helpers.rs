// Helper functions for safe logging and JSON-text column serialization

use serde::{Serialize, Serializer};

/// Masks email addresses for safe logging
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Serializes a JSON-text column holding an array of strings as a real
/// array in API responses; NULL and garbage both become `[]`.
pub fn serialize_string_list<S>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match raw {
        Some(json_text) => {
            let items: Vec<String> = serde_json::from_str(json_text).unwrap_or_default();
            items.serialize(serializer)
        }
        None => Vec::<String>::new().serialize(serializer),
    }
}

/// Serializes a JSON-text column holding an arbitrary JSON value; NULL and
/// garbage both become `null`.
pub fn serialize_json_column<S>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match raw {
        Some(json_text) => {
            let value: serde_json::Value =
                serde_json::from_str(json_text).unwrap_or(serde_json::Value::Null);
            value.serialize(serializer)
        }
        None => serde_json::Value::Null.serialize(serializer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
    }

    #[derive(Serialize)]
    struct Wrapper {
        #[serde(serialize_with = "serialize_string_list")]
        skills: Option<String>,
        #[serde(serialize_with = "serialize_json_column")]
        evaluation: Option<String>,
    }

    #[test]
    fn json_text_columns_serialize_as_values() {
        let w = Wrapper {
            skills: Some(r#"["Rust","SQL"]"#.to_string()),
            evaluation: Some(r#"{"ats_score":75}"#.to_string()),
        };
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["skills"][1], "SQL");
        assert_eq!(v["evaluation"]["ats_score"], 75);

        let empty = Wrapper {
            skills: None,
            evaluation: None,
        };
        let v = serde_json::to_value(&empty).unwrap();
        assert_eq!(v["skills"], serde_json::json!([]));
        assert!(v["evaluation"].is_null());
    }
}
