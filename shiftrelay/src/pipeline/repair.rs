//! Model output repair
//!
//! Turns the free-form text a model returns into a JSON array of shift
//! objects. Each rule is a pure `&str -> String` transformation; [`RULES`]
//! applies them in a fixed order, unconditionally, before a single parse
//! attempt. Either the whole text parses or the call fails with a
//! [`RepairError`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

/// One text rewrite
pub type RepairRule = fn(&str) -> String;

/// Rewrites in application order
pub const RULES: &[(&str, RepairRule)] = &[
    ("extract_object_span", extract_object_span),
    ("strip_code_fences", strip_code_fences),
    ("collapse_newlines", collapse_newlines),
    ("remove_trailing_commas", remove_trailing_commas),
    ("wrap_single_object", wrap_single_object),
    ("join_adjacent_objects", join_adjacent_objects),
    ("ensure_array", ensure_array),
];

static NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r\n|\r|\n|\\r\\n|\\n|\\r)+").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));
static DOUBLED_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:\s*,)+").expect("valid regex"));
static ADJACENT_OBJECTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}\s*\{").expect("valid regex"));

/// Repaired text still failed to parse
#[derive(Debug, Clone, Error)]
#[error("could not parse model response as JSON: {message}")]
pub struct RepairError {
    /// Parser diagnostic
    pub message: String,
    /// Text after all rules ran
    pub repaired: String,
}

/// Run every rule, then parse
///
/// A parsed non-array value becomes a one-element sequence.
pub fn repair_shift_json(raw: &str) -> Result<Vec<Value>, RepairError> {
    let repaired = apply_rules(raw);

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(RepairError {
            message: e.to_string(),
            repaired,
        }),
    }
}

/// Apply [`RULES`] in order
pub fn apply_rules(raw: &str) -> String {
    RULES.iter().fold(raw.to_string(), |text, (name, rule)| {
        let next = rule(&text);
        if next != text {
            trace!(rule = *name, "Repair rule rewrote model output");
        }
        next
    })
}

/// Keep the first `{` through the last `}`
pub fn extract_object_span(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Drop Markdown fences and stray backticks at either end
pub fn strip_code_fences(text: &str) -> String {
    let mut out = text.trim();
    if let Some(rest) = out.strip_prefix("```") {
        out = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = out.strip_suffix("```") {
        out = rest;
    }
    out.trim().trim_matches('`').trim().to_string()
}

/// Real or escaped newline runs become one space
pub fn collapse_newlines(text: &str) -> String {
    NEWLINES.replace_all(text, " ").into_owned()
}

/// `,}` / `,]` lose the comma; `,,` collapses to `,`
pub fn remove_trailing_commas(text: &str) -> String {
    let collapsed = DOUBLED_COMMA.replace_all(text, ",");
    TRAILING_COMMA.replace_all(&collapsed, "$1").into_owned()
}

/// A bare object is wrapped in an array
pub fn wrap_single_object(text: &str) -> String {
    if text.trim_start().starts_with('{') {
        format!("[{}]", text)
    } else {
        text.to_string()
    }
}

/// `}{` (optionally separated by whitespace) becomes `},{`
pub fn join_adjacent_objects(text: &str) -> String {
    ADJACENT_OBJECTS.replace_all(text, "},{").into_owned()
}

/// Anything not already an array is wrapped in one
pub fn ensure_array(text: &str) -> String {
    if text.trim_start().starts_with('[') {
        text.to_string()
    } else {
        format!("[{}]", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_single_object() {
        let raw = "Here is the schedule:\n```json\n{\"date\": \"1-Dec-24\", \"employeeRef\": \"Jane Doe\"}\n```\nLet me know!";
        let shifts = repair_shift_json(raw).unwrap();

        assert_eq!(shifts, vec![json!({"date": "1-Dec-24", "employeeRef": "Jane Doe"})]);
    }

    #[test]
    fn test_literal_newline_inside_string_value() {
        let raw = "{\"date\": \"1-Dec-24\", \"strComment\": \"Opening\nshift\"}";
        let shifts = repair_shift_json(raw).unwrap();

        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0]["strComment"], "Opening shift");
        assert_eq!(shifts[0]["date"], "1-Dec-24");
    }

    #[test]
    fn test_escaped_newlines_collapse() {
        assert_eq!(collapse_newlines("a\\n\\nb"), "a b");
        assert_eq!(collapse_newlines("a\r\n\r\nb\nc"), "a b c");
    }

    #[test]
    fn test_concatenated_objects_keep_order() {
        let raw = "{\"employeeRef\": \"A\"}\n  {\"employeeRef\": \"B\"}{\"employeeRef\": \"C\"}";
        let shifts = repair_shift_json(raw).unwrap();

        let refs: Vec<&str> = shifts
            .iter()
            .map(|s| s["employeeRef"].as_str().unwrap())
            .collect();
        assert_eq!(refs, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_array_output_passes_through() {
        let raw = "```json\n[{\"employeeRef\": \"A\"}, {\"employeeRef\": \"B\"},]\n```";
        let shifts = repair_shift_json(raw).unwrap();
        assert_eq!(shifts.len(), 2);
    }

    #[test]
    fn test_trailing_and_doubled_commas() {
        assert_eq!(remove_trailing_commas("{\"a\": 1, }"), "{\"a\": 1}");
        assert_eq!(remove_trailing_commas("[1, 2 ,\n]"), "[1, 2 ]");
        assert_eq!(remove_trailing_commas("{\"a\": 1,, \"b\": 2}"), "{\"a\": 1, \"b\": 2}");
        assert_eq!(remove_trailing_commas("{\"a\": 1, , ,}"), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_span_without_braces_is_identity() {
        assert_eq!(extract_object_span("no json here"), "no json here");
        assert_eq!(extract_object_span("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("`{}`"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_wrap_rules() {
        assert_eq!(wrap_single_object("{\"a\":1}"), "[{\"a\":1}]");
        assert_eq!(wrap_single_object("[1]"), "[1]");
        assert_eq!(ensure_array("[1]"), "[1]");
        assert_eq!(ensure_array("1"), "[1]");
        assert_eq!(join_adjacent_objects("{}  {}{}"), "{},{},{}");
    }

    #[test]
    fn test_prose_only_is_error() {
        let err = repair_shift_json("I could not read any shifts in this image.").unwrap_err();
        assert!(!err.message.is_empty());
        assert_eq!(err.repaired, "[I could not read any shifts in this image.]");
    }

    #[test]
    fn test_broken_object_is_error() {
        let err = repair_shift_json("{\"date\": \"1-Dec-24\" \"startTime\": }").unwrap_err();
        assert!(err.to_string().starts_with("could not parse model response"));
    }

    #[test]
    fn test_rules_run_in_declared_order() {
        let names: Vec<&str> = RULES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "extract_object_span",
                "strip_code_fences",
                "collapse_newlines",
                "remove_trailing_commas",
                "wrap_single_object",
                "join_adjacent_objects",
                "ensure_array",
            ]
        );
    }
}
