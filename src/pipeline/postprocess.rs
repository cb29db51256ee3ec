//! Post-processing: turn the model's free text into a validated [`MrnRecord`].
//!
//! ## Why is post-processing necessary?
//!
//! Even well-prompted VLMs occasionally ignore the output rules:
//!
//! - Wrapping the JSON in ` ```json ... ``` ` fences despite the prompt
//!   saying "do not wrap in fences"
//! - Reading the sub-division code into the wrong field, or returning a
//!   neighbouring account / meter number in its place
//!
//! ## Rule Order
//!
//! 1. Strip fences and the language tag
//! 2. Parse a JSON object (any error becomes a parse failure, never a panic)
//! 3. Normalise `sub_division` to a 5-6 digit code or empty
//! 4. If empty, salvage the first 5-6 digit value from the other fields
//! 5. Assemble the record

use crate::output::{ExtractionFailure, ExtractionResult};
use crate::schema::{value_to_field, MrnRecord, SUB_DIVISION};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Run every normalisation step on a raw model response.
///
/// Always returns a value: a parse error is reported as
/// [`ExtractionResult::Failure`] carrying the untouched `raw` text.
pub fn normalize_response(raw: &str) -> ExtractionResult {
    let cleaned = strip_code_fences(raw);

    let object = match parse_object(&cleaned) {
        Ok(object) => object,
        Err(exception) => {
            warn!("Model output is not a JSON object: {}", exception);
            return ExtractionFailure::parse_failure(raw, exception).into();
        }
    };

    let mut record = MrnRecord::from_json_object(&object);
    record.sub_division = recover_sub_division(&object);
    ExtractionResult::Success(record)
}

// ── Step 1: Strip fences ─────────────────────────────────────────────────────

/// Info string on the opening fence line: `json`, `JSON5`, `jsonc`, `javascript`...
static RE_FENCE_INFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*[A-Za-z][A-Za-z0-9_+.-]*[ \t]*\r?\n").unwrap());

static RE_LANG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^json\b").unwrap());

/// Remove Markdown code fences and a leading language tag.
///
/// Any tag on its own line after the opening fence is dropped; a bare `json`
/// token is also dropped from unfenced or single-line text. Text without a
/// fence passes through trimmed, so the function is idempotent on clean JSON.
pub fn strip_code_fences(input: &str) -> String {
    let mut text = input.trim();

    if let Some(mut after_open) = text.strip_prefix(FENCE) {
        if let Some(m) = RE_FENCE_INFO.find(after_open) {
            after_open = &after_open[m.end()..];
        }
        // Content between the first pair of fences; an unterminated fence
        // keeps everything after the opening one.
        text = match after_open.find(FENCE) {
            Some(end) => &after_open[..end],
            None => after_open,
        };
        text = text.trim();
    }

    if let Some(m) = RE_LANG_TAG.find(text) {
        text = text[m.end()..].trim();
    }

    text.to_string()
}

// ── Step 2: Parse ────────────────────────────────────────────────────────────

/// Parse `text` as a JSON object, keeping key order.
///
/// The error is the diagnostic string stored in the failure record.
fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        )),
        Err(e) => Err(e.to_string()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Step 3: Normalise sub_division ───────────────────────────────────────────

static RE_NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D+").unwrap());

/// Zero code points of the decimal digit runs seen on Indian utility forms.
const DIGIT_ZEROS: [u32; 12] = [
    0x0660, // Arabic-Indic
    0x06F0, // Extended Arabic-Indic
    0x0966, // Devanagari
    0x09E6, // Bengali
    0x0A66, // Gurmukhi
    0x0AE6, // Gujarati
    0x0B66, // Oriya
    0x0BE6, // Tamil
    0x0C66, // Telugu
    0x0CE6, // Kannada
    0x0D66, // Malayalam
    0xFF10, // Fullwidth
];

fn to_ascii_digit(c: char) -> char {
    DIGIT_ZEROS
        .iter()
        .find_map(|&zero| {
            let offset = u32::from(c).wrapping_sub(zero);
            (offset < 10).then(|| char::from(b'0' + offset as u8))
        })
        .unwrap_or(c)
}

/// Keep only decimal digits; accept the result if it is 5 or 6 digits long.
///
/// Any Unicode decimal digit counts. Digits from the scripts in
/// [`DIGIT_ZEROS`] are mapped to ASCII. Anything else (too short, too long,
/// no digits) yields an empty string.
pub fn normalize_sub_division(value: &str) -> String {
    let digits: String = RE_NON_DIGIT
        .replace_all(value, "")
        .chars()
        .map(to_ascii_digit)
        .collect();
    if matches!(digits.chars().count(), 5 | 6) {
        digits
    } else {
        String::new()
    }
}

// ── Step 4: Fallback recovery ────────────────────────────────────────────────

/// Resolve the final `sub_division` for a parsed response.
///
/// Uses the model's own `sub_division` when it normalises cleanly. Otherwise
/// every other field is scanned in the order the model returned them and the
/// first one whose digits form a 5-6 digit code wins. Empty if none does.
pub fn recover_sub_division(object: &Map<String, Value>) -> String {
    let primary = object
        .get(SUB_DIVISION)
        .map(value_to_field)
        .unwrap_or_default();
    let normalized = normalize_sub_division(&primary);
    if !normalized.is_empty() {
        return normalized;
    }

    let recovered = object
        .iter()
        .filter(|(key, _)| key.as_str() != SUB_DIVISION)
        .find_map(|(key, value)| {
            let candidate = normalize_sub_division(&value_to_field(value));
            (!candidate.is_empty()).then(|| (key, candidate))
        });

    match recovered {
        Some((field, code)) => {
            warn!(
                "sub_division {:?} rejected; recovered {} from field '{}'",
                primary, code, field
            );
            code
        }
        None => {
            debug!("sub_division {:?} rejected; no fallback candidate", primary);
            String::new()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;
    use crate::schema::MRN_FIELDS;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strip_json_fence() {
        let input = "```json\n{\"a\": \"1\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": \"1\"}");
    }

    #[test]
    fn test_strip_fence_no_lang() {
        let input = "```\n{\"a\": \"1\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": \"1\"}");
    }

    #[test]
    fn test_strip_uppercase_lang_tag() {
        let input = "  ```JSON\n{}\n```  ";
        assert_eq!(strip_code_fences(input), "{}");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        let input = "```json\n{\"a\": \"1\"}";
        assert_eq!(strip_code_fences(input), "{\"a\": \"1\"}");
    }

    #[test]
    fn test_strip_keeps_first_fenced_block_only() {
        let input = "```json\n{\"a\": \"1\"}\n```\nSome notes\n```\nmore\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": \"1\"}");
    }

    #[test]
    fn test_strip_other_fence_tags() {
        for tag in ["jsonc", "JSON5", "javascript", "text"] {
            let input = format!("```{tag}\n{{\"a\": \"1\"}}\n```");
            assert_eq!(strip_code_fences(&input), "{\"a\": \"1\"}", "tag {tag}");
        }
        let result = normalize_response("```jsonc\n{\"sub_division\": \"121336\"}\n```");
        assert_eq!(result.record().unwrap().sub_division, "121336");
    }

    #[test]
    fn test_lang_tag_without_fence() {
        assert_eq!(strip_code_fences("json {\"a\": \"1\"}"), "{\"a\": \"1\"}");
        assert_eq!(strip_code_fences("jsonify me"), "jsonify me");
    }

    #[test]
    fn test_strip_is_idempotent_on_clean_json() {
        let clean = "{\"sub_division\": \"121336\", \"feeder_name\": \"\"}";
        assert_eq!(strip_code_fences(clean), clean);
        let once = strip_code_fences("```json\n{\"x\": \"y\"}\n```");
        assert_eq!(strip_code_fences(&once), once);
    }

    #[test]
    fn test_normalize_sub_division() {
        assert_eq!(normalize_sub_division("SD-12345"), "12345");
        assert_eq!(normalize_sub_division("121336"), "121336");
        assert_eq!(normalize_sub_division("1234"), "");
        assert_eq!(normalize_sub_division("1234567"), "");
        assert_eq!(normalize_sub_division(""), "");
        assert_eq!(normalize_sub_division("Sub Div 12 13 36"), "121336");
    }

    #[test]
    fn test_normalize_native_digits() {
        assert_eq!(normalize_sub_division("१२१३३६"), "121336");
        assert_eq!(normalize_sub_division("उप मंडल ४५६७८"), "45678");
        assert_eq!(normalize_sub_division("১২৩৪৫"), "12345");
        assert_eq!(normalize_sub_division("１２３４５"), "12345");
        assert_eq!(normalize_sub_division("१२३४"), "");
        // superscripts are not decimal digits
        assert_eq!(normalize_sub_division("12345²"), "12345");
    }

    #[test]
    fn test_primary_value_wins_when_valid() {
        let obj = object(json!({
            "sub_division": "S/D 54321",
            "old_meter_no": "MGS39585"
        }));
        assert_eq!(recover_sub_division(&obj), "54321");
    }

    #[test]
    fn test_fallback_skips_rejected_fields() {
        let obj = object(json!({
            "sub_division": "",
            "consumer_account_no": "00/08/302393",
            "old_meter_no": "MGS39585",
            "new_meter_no": "123456"
        }));
        assert_eq!(recover_sub_division(&obj), "39585");
    }

    #[test]
    fn test_fallback_follows_returned_order() {
        let obj = object(json!({
            "new_meter_no": "654321",
            "sub_division": "N/A",
            "old_meter_no": "MGS39585"
        }));
        assert_eq!(recover_sub_division(&obj), "654321");
    }

    #[test]
    fn test_fallback_when_sub_division_missing() {
        let obj = object(json!({ "feeder_name": "Feeder 11245" }));
        assert_eq!(recover_sub_division(&obj), "11245");
    }

    #[test]
    fn test_fallback_finds_nothing() {
        let obj = object(json!({
            "sub_division": "12",
            "consumer_account_no": "00/08/302393",
            "consumer_name": "Anil Kumar"
        }));
        assert_eq!(recover_sub_division(&obj), "");
    }

    #[test]
    fn test_numeric_sub_division() {
        let obj = object(json!({ "sub_division": 121336 }));
        assert_eq!(recover_sub_division(&obj), "121336");
    }

    #[test]
    fn test_fenced_response_parses() {
        let mut fields = serde_json::Map::new();
        for name in MRN_FIELDS {
            fields.insert(name.to_string(), Value::String(String::new()));
        }
        fields.insert("sub_division".into(), Value::String("121336".into()));
        let raw = format!("```json\n{}\n```", Value::Object(fields));

        let result = normalize_response(&raw);
        let record = result.record().expect("fenced JSON should parse");
        assert_eq!(record.sub_division, "121336");
    }

    #[test]
    fn test_prose_refusal_is_parse_failure() {
        let raw = "I'm sorry, but I can't read the text in this image.";
        let result = normalize_response(raw);
        let failure = result.failure().expect("prose should not parse");
        assert_eq!(failure.kind, FailureKind::ParseFailure);
        assert_eq!(failure.raw_output, raw);
        assert!(failure.exception.is_some());
    }

    #[test]
    fn test_raw_output_kept_unstripped() {
        let raw = "```json\n{not json}\n```";
        let failure = normalize_response(raw).failure().cloned().unwrap();
        assert_eq!(failure.raw_output, raw);
    }

    #[test]
    fn test_non_object_is_parse_failure() {
        let failure = normalize_response("[1, 2, 3]").failure().cloned().unwrap();
        assert_eq!(failure.kind, FailureKind::ParseFailure);
        assert_eq!(
            failure.exception.as_deref(),
            Some("expected a JSON object, found an array")
        );
    }

    #[test]
    fn test_empty_response_is_parse_failure() {
        assert!(!normalize_response("").is_success());
        assert!(!normalize_response("   \n").is_success());
    }

    #[test]
    fn test_full_pipeline_repairs_sub_division() {
        let raw = r#"{
            "sub_division": "",
            "feeder_name": "Rampur",
            "consumer_name": "Anil Kumar",
            "consumer_address": "H.No 12, Ward 4",
            "consumer_account_no": "00/08/302393",
            "date_of_installation": "12/03/2024",
            "old_meter_no": "MGS39585",
            "old_meter_reading": "4521",
            "old_meter_make": "Genus",
            "new_meter_no": "",
            "new_meter_reading": "0",
            "new_meter_make": "HPL",
            "consumer_category": "Domestic"
        }"#;
        let record = normalize_response(raw).record().cloned().unwrap();
        assert_eq!(record.sub_division, "39585");
        assert_eq!(record.consumer_account_no, "00/08/302393");
        assert_eq!(record.old_meter_no, "MGS39585", "other fields untouched");
        assert_eq!(record.feeder_name, "Rampur");
    }

    #[test]
    fn test_error_field_from_model_is_not_a_failure() {
        let raw = r#"{"error": "smudged", "sub_division": "121336"}"#;
        let result = normalize_response(raw);
        assert!(result.is_success());
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
    }
}
