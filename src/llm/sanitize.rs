// src/llm/sanitize.rs
//! Multi-stage JSON sanitizer for generative model output.
//!
//! Models asked to "return only JSON" still emit near-JSON often enough that
//! a single blanket fix either over-corrects well-formed output or
//! under-corrects broken output. The repair pipeline applies increasingly
//! aggressive textual transforms and stops at the first one that parses:
//!
//! 1. direct parse
//! 2. trailing-comma stripping
//! 3. character-level repair of string values (raw control characters,
//!    unescaped internal quotes)
//! 4. single-quote normalization
//! 5. stage 3 applied on top of stage 4
//!
//! Callers isolate the `{...}` payload with [`extract_json_object`] before
//! invoking [`repair`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::error::LlmError;

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```json|```").expect("valid fence regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid trailing-comma regex"))
}

fn single_quoted_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([{,\[\s])\s*'([^']+)'\s*:").expect("valid key regex"))
}

fn single_quoted_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*'([^']*)'").expect("valid value regex"))
}

/// Isolates the JSON object payload from a raw model response.
///
/// Strips markdown code-fence markers, then takes the greedy span from the
/// first `{` to the last `}`. Anything the model wrapped around the object
/// (prose, labels, fences) is discarded.
pub fn extract_json_object(response: &str) -> Result<String, LlmError> {
    let cleaned = code_fence_re().replace_all(response, "");
    let cleaned = cleaned.trim();

    let start = cleaned.find('{').ok_or(LlmError::NoJsonFound)?;
    let end = cleaned.rfind('}').ok_or(LlmError::NoJsonFound)?;
    if end < start {
        return Err(LlmError::NoJsonFound);
    }

    Ok(cleaned[start..=end].to_string())
}

/// Repairs near-JSON text into a parsed value, or fails with
/// [`LlmError::UnrecoverableFormat`] when no stage parses.
pub fn repair(text: &str) -> Result<Value, LlmError> {
    // 1. Fast path: the model behaved.
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    // 2. Light cleanup: trailing commas before `}` / `]`.
    let cleaned = strip_trailing_commas(text);
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Ok(value);
    }

    // 3. Character-level repair inside string values.
    let cleaned = strip_trailing_commas(&fix_string_values(&cleaned));
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Ok(value);
    }

    // 4. Single-quoted keys/values, seen from some models. Applied to the
    //    original text, not stage 3's output.
    let requoted = strip_trailing_commas(&normalize_single_quotes(text));
    if let Ok(value) = serde_json::from_str(&requoted) {
        return Ok(value);
    }

    // 5. String-value repair on top of the single-quote fix.
    let requoted = strip_trailing_commas(&fix_string_values(&requoted));
    serde_json::from_str(&requoted).map_err(LlmError::UnrecoverableFormat)
}

/// Removes commas that immediately precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    trailing_comma_re().replace_all(text, "$1").into_owned()
}

/// Rewrites `'key':` to `"key":` and `: 'value'` to `: "value"` where the
/// single quote is adjacent to structural punctuation.
fn normalize_single_quotes(text: &str) -> String {
    let keys_fixed = single_quoted_key_re().replace_all(text, "$1\"$2\":");
    single_quoted_value_re()
        .replace_all(&keys_fixed, ": \"$1\"")
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    OutsideString,
    InsideString,
    AfterEscape,
}

/// Character-level scan fixing unescaped content inside JSON string values:
/// raw newlines/carriage returns/tabs become their escapes, other control
/// characters become `\u00XX`, and an embedded `"` is distinguished from a
/// true closing quote by whitespace-skipping look-ahead.
fn fix_string_values(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::OutsideString;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            ScanState::OutsideString => {
                out.push(c);
                if c == '"' {
                    state = ScanState::InsideString;
                }
                i += 1;
            }
            ScanState::AfterEscape => {
                out.push(c);
                state = ScanState::InsideString;
                i += 1;
            }
            ScanState::InsideString => match c {
                '\\' => {
                    out.push(c);
                    state = ScanState::AfterEscape;
                    i += 1;
                }
                '"' => {
                    // Closing quote, or an unescaped quote inside the value?
                    // Look past whitespace at the next meaningful character.
                    let mut j = i + 1;
                    while j < chars.len() && chars[j].is_whitespace() {
                        j += 1;
                    }
                    match chars.get(j) {
                        Some(',') | Some('}') | Some(']') | Some(':') | Some('"') | None => {
                            out.push(c);
                            state = ScanState::OutsideString;
                        }
                        Some(_) => out.push_str("\\\""),
                    }
                    i += 1;
                }
                '\n' => {
                    out.push_str("\\n");
                    i += 1;
                }
                '\r' => {
                    out.push_str("\\r");
                    i += 1;
                }
                '\t' => {
                    out.push_str("\\t");
                    i += 1;
                }
                c if (c as u32) < 0x20 => {
                    out.push_str(&format!("\\u{:04x}", c as u32));
                    i += 1;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            },
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_from_prose() {
        let response = "Here is the result you asked for:\n{\"name\": \"Jane\"}\nHope it helps!";
        let payload = extract_json_object(response).unwrap();
        assert_eq!(payload, "{\"name\": \"Jane\"}");
    }

    #[test]
    fn extracts_object_from_code_fence() {
        let response = "```json\n{\"name\": \"Jane\", \"skills\": [\"Rust\"]}\n```";
        let payload = extract_json_object(response).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value, json!({"name": "Jane", "skills": ["Rust"]}));
    }

    #[test]
    fn fence_marker_case_is_ignored() {
        let response = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn no_braces_is_an_error() {
        let err = extract_json_object("the resume could not be parsed").unwrap_err();
        assert!(matches!(err, LlmError::NoJsonFound));
    }

    #[test]
    fn reversed_braces_is_an_error() {
        let err = extract_json_object("} nothing here {").unwrap_err();
        assert!(matches!(err, LlmError::NoJsonFound));
    }

    #[test]
    fn wrapped_object_parses_same_as_direct() {
        let object = json!({"name": "Jane", "email": "jane@example.com", "cgpa": 8.5});
        let wrapped = format!("Sure! Here you go:\n```json\n{}\n```", object);
        let payload = extract_json_object(&wrapped).unwrap();
        assert_eq!(repair(&payload).unwrap(), object);
    }

    #[test]
    fn well_formed_json_passes_through() {
        let text = r#"{"name": "Jane", "skills": ["Rust", "SQL"]}"#;
        assert_eq!(
            repair(text).unwrap(),
            json!({"name": "Jane", "skills": ["Rust", "SQL"]})
        );
    }

    #[test]
    fn trailing_commas_are_stripped() {
        let text = r#"{"skills": ["Rust", "SQL",], "name": "Jane",}"#;
        let value = repair(text).unwrap();
        assert_eq!(value, json!({"skills": ["Rust", "SQL"], "name": "Jane"}));
        // Re-serialization carries no trace of the commas.
        assert!(!value.to_string().contains(",]"));
        assert!(!value.to_string().contains(",}"));
    }

    #[test]
    fn raw_newline_in_string_round_trips() {
        let text = "{\"summary\": \"line one\nline two\"}";
        let value = repair(text).unwrap();
        assert_eq!(value["summary"], "line one\nline two");
    }

    #[test]
    fn raw_tab_and_carriage_return_round_trip() {
        let text = "{\"summary\": \"a\tb\rc\"}";
        let value = repair(text).unwrap();
        assert_eq!(value["summary"], "a\tb\rc");
    }

    #[test]
    fn control_character_becomes_unicode_escape() {
        let text = "{\"summary\": \"a\u{0001}b\"}";
        let value = repair(text).unwrap();
        assert_eq!(value["summary"], "a\u{0001}b");
    }

    #[test]
    fn unescaped_internal_quote_is_escaped() {
        // The quote before `quoted` is followed by a letter, so it is an
        // internal quote, not a closing one.
        let text = r#"{"summary": "she said "quoted" and left"}"#;
        let value = repair(text).unwrap();
        assert_eq!(value["summary"], r#"she said "quoted" and left"#);
    }

    #[test]
    fn closing_quote_before_comma_is_kept() {
        let text = r#"{"a": "x", "b": "y"}"#;
        assert_eq!(fix_string_values(text), text);
    }

    #[test]
    fn closing_quote_at_end_of_input_is_kept() {
        // Truncated output: the final quote has nothing after it and must
        // still close the string.
        let text = r#"{"a": "x""#;
        assert_eq!(fix_string_values(text), text);
    }

    #[test]
    fn escaped_quote_is_left_alone() {
        let text = r#"{"a": "already \" escaped"}"#;
        assert_eq!(fix_string_values(text), text);
        assert_eq!(repair(text).unwrap()["a"], r#"already " escaped"#);
    }

    #[test]
    fn single_quoted_keys_and_values_are_normalized() {
        let text = "{'name': 'Jane', 'desired_role': 'Backend Engineer', 'backlogs': 0}";
        let value = repair(text).unwrap();
        assert_eq!(value["name"], "Jane");
        assert_eq!(value["desired_role"], "Backend Engineer");
        assert_eq!(value["backlogs"], 0);
    }

    #[test]
    fn single_quotes_with_trailing_comma() {
        let text = "{'name': 'Jane',}";
        assert_eq!(repair(text).unwrap(), json!({"name": "Jane"}));
    }

    #[test]
    fn single_quotes_and_raw_newline_need_the_final_stage() {
        let text = "{'summary': 'line one\nline two'}";
        let value = repair(text).unwrap();
        assert_eq!(value["summary"], "line one\nline two");
    }

    #[test]
    fn apostrophe_inside_double_quoted_value_survives() {
        let text = r#"{"summary": "it's fine"}"#;
        assert_eq!(repair(text).unwrap()["summary"], "it's fine");
    }

    #[test]
    fn hopeless_input_fails_with_format_error() {
        let err = repair("{this is not json at all").unwrap_err();
        assert!(matches!(err, LlmError::UnrecoverableFormat(_)));
    }

    #[test]
    fn nested_structures_survive_repair() {
        let text = r#"{
            "internships": [
                {"company": "TCS", "role": "Software Intern",},
            ],
            "skills": ["Rust",],
        }"#;
        let value = repair(text).unwrap();
        assert_eq!(value["internships"][0]["company"], "TCS");
        assert_eq!(value["skills"], json!(["Rust"]));
    }
}
