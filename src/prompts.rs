//! Instruction prompt for MRN field extraction.
//!
//! The prompt is the only place the model learns the schema and the
//! disambiguation rules, so it is built from [`crate::schema::MRN_FIELDS`]
//! rather than typed out by hand. Unit tests inspect it directly, which
//! makes prompt regressions easy to catch without a live model.
//!
//! Callers can override it via [`crate::config::ExtractionConfig::prompt`];
//! the text here is used only when no override is provided.

use crate::schema::MRN_FIELDS;
use once_cell::sync::Lazy;

/// Bumped whenever the wording of [`extraction_prompt`] changes.
pub const PROMPT_VERSION: &str = "mrn-v2";

const PROMPT_HEADER: &str = r#"You are an OCR and document understanding system.

Extract the following fields from the Meter Replacement Notice (MRN) image.

Fields:"#;

const PROMPT_RULES: &str = r#"Rules:

1. OUTPUT FORMAT
   - Return ONLY a raw JSON object with exactly the fields listed above
   - Do NOT wrap the JSON in ``` fences
   - Do NOT add commentary or explanations

2. MISSING FIELDS
   - If a field is not present or unreadable, return an empty string ""
   - Never omit a field and never use null

3. SUB-DIVISION
   - sub_division is a 5 or 6 digit numeric code (for example 121336)
   - It is NOT the consumer account number, NOT the feeder code and NOT a meter number
   - Return the digits only, without labels, spaces or punctuation
   - If no 5 or 6 digit sub-division code is visible, return """#;

static EXTRACTION_PROMPT: Lazy<String> = Lazy::new(|| {
    let fields = MRN_FIELDS.join("\n");
    format!("{PROMPT_HEADER}\n{fields}\n\n{PROMPT_RULES}")
});

/// The default instruction sent alongside every notice image.
///
/// Pure and deterministic: built once from the fixed schema, identical for
/// every call.
pub fn extraction_prompt() -> &'static str {
    EXTRACTION_PROMPT.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_field_in_order() {
        let prompt = extraction_prompt();
        let mut last = 0;
        for field in MRN_FIELDS {
            let line = format!("\n{field}\n");
            let pos = prompt
                .find(&line)
                .unwrap_or_else(|| panic!("field {field} missing from prompt"));
            assert!(pos >= last, "field {field} out of order");
            last = pos;
        }
    }

    #[test]
    fn prompt_demands_raw_json() {
        let prompt = extraction_prompt();
        assert!(prompt.contains("ONLY a raw JSON object"));
        assert!(prompt.contains("Do NOT wrap the JSON in ``` fences"));
    }

    #[test]
    fn prompt_requires_empty_strings_not_null() {
        let prompt = extraction_prompt();
        assert!(prompt.contains("empty string"));
        assert!(prompt.contains("never use null"));
    }

    #[test]
    fn prompt_disambiguates_sub_division() {
        let prompt = extraction_prompt();
        assert!(prompt.contains("5 or 6 digit numeric code"));
        assert!(prompt.contains("NOT the consumer account number"));
        assert!(prompt.contains("NOT the feeder code"));
        assert!(prompt.contains("NOT a meter number"));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert!(std::ptr::eq(extraction_prompt(), extraction_prompt()));
        assert_eq!(extraction_prompt(), extraction_prompt().to_string());
    }
}
