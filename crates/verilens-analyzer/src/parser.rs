//! Parse model output into classifications and fact-checks

use crate::error::ParseError;
use crate::types::{Classification, FactCheck};
use serde_json::{Map, Value};
use tracing::debug;
use verilens_domain::Category;

const FENCE: &str = "```";

/// Extract a JSON value from model output
///
/// Models are asked for bare JSON but often wrap it in a Markdown code
/// block, or surround it with prose. Fenced output is unwrapped first; if
/// the result still does not parse, an embedded fenced block and then the
/// outermost `{...}` span are tried. The first successful parse wins.
pub fn extract_json(raw: &str) -> Result<Value, ParseError> {
    let cleaned = strip_code_fence(raw);

    let first_error = match serde_json::from_str(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for candidate in [embedded_fence(raw), outer_object(raw)].into_iter().flatten() {
        if let Ok(value) = serde_json::from_str(candidate) {
            debug!("Recovered JSON from surrounding prose");
            return Ok(value);
        }
    }

    Err(ParseError::new(raw, first_error.to_string()))
}

/// Remove a Markdown fence wrapping the whole text, with its `json` tag
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed;
    }

    let inner = trimmed.trim_matches('`');
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.trim()
}

/// Body of the first fenced block found anywhere in the text
fn embedded_fence(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let body = &rest[..rest.find(FENCE)?];

    // Drop the language tag on the opening line
    let body = match body.split_once('\n') {
        Some((tag, tail)) if !tag.trim_start().starts_with(['{', '[']) => tail,
        _ => body,
    };
    Some(body.trim())
}

/// Span from the first `{` to the last `}`
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn as_object<'a>(raw: &str, value: &'a Value) -> Result<&'a Map<String, Value>, ParseError> {
    value
        .as_object()
        .ok_or_else(|| ParseError::new(raw, "expected a JSON object"))
}

fn required_str<'a>(raw: &str, obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, ParseError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::new(raw, format!("missing or invalid '{}'", field)))
}

/// Parse a classification answer
///
/// Labels the model invents outside the known set map to `unknown`, with
/// the label kept in the reason. The model may not answer `error`: that
/// category is reserved for failed provider calls.
pub fn parse_classification(raw: &str) -> Result<Classification, ParseError> {
    let value = extract_json(raw)?;
    let obj = as_object(raw, &value)?;

    let label = required_str(raw, obj, "type")?;
    let reason = required_str(raw, obj, "reason")?;

    Ok(match Category::parse(label) {
        Some(category) if category != Category::Error => Classification {
            category,
            reason: reason.to_string(),
        },
        _ => Classification {
            category: Category::Unknown,
            reason: format!("Unrecognised category '{}': {}", label, reason),
        },
    })
}

/// Parse a fact-check answer
pub fn parse_fact_check(raw: &str) -> Result<FactCheck, ParseError> {
    let value = extract_json(raw)?;
    let obj = as_object(raw, &value)?;

    let score = match obj.get("score") {
        None | Some(Value::Null) => None,
        Some(score) => Some(read_score(score).ok_or_else(|| {
            ParseError::new(raw, format!("invalid 'score': {}", score))
        })?),
    };
    let explanation = required_str(raw, obj, "explanation")?;

    Ok(FactCheck {
        score,
        explanation: explanation.to_string(),
    })
}

/// Read a score as an integer in 0..=100
///
/// Accepts integers, floats (rounded) and numeric strings; out-of-range
/// values are clamped.
fn read_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"key": "value"}"#).unwrap();
        assert_eq!(value, json!({"key": "value"}));
    }

    #[test]
    fn test_extract_json_from_markdown() {
        let response = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(response).unwrap(), json!({"key": "value"}));
    }

    #[test]
    fn test_extract_json_tag_is_case_insensitive() {
        let response = "  ```JSON\n{\"key\": 1}\n```  \n";
        assert_eq!(extract_json(response).unwrap(), json!({"key": 1}));
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        let response = "```\n{\"key\": [1, 2]}\n```";
        assert_eq!(extract_json(response).unwrap(), json!({"key": [1, 2]}));
    }

    #[test]
    fn test_fenced_and_unfenced_yield_same_value() {
        let original = json!({
            "type": "claim",
            "reason": "states \"facts\" with ``` inside",
            "nested": {"list": [1, 2.5, null, true]}
        });
        let compact = serde_json::to_string(&original).unwrap();
        let pretty = serde_json::to_string_pretty(&original).unwrap();

        assert_eq!(extract_json(&compact).unwrap(), original);
        assert_eq!(extract_json(&format!("```json\n{}\n```", pretty)).unwrap(), original);
        assert_eq!(extract_json(&format!("```json{}```", compact)).unwrap(), original);
    }

    #[test]
    fn test_extract_json_from_prose_with_fence() {
        let response = "Sure! Here is the result:\n```json\n{\"score\": 10}\n```\nHope it helps.";
        assert_eq!(extract_json(response).unwrap(), json!({"score": 10}));
    }

    #[test]
    fn test_extract_json_from_prose_without_fence() {
        let response = "The answer is {\"score\": 42, \"explanation\": \"unclear\"} as requested.";
        assert_eq!(
            extract_json(response).unwrap(),
            json!({"score": 42, "explanation": "unclear"})
        );
    }

    #[test]
    fn test_extract_invalid_json_keeps_raw() {
        let err = extract_json("not json").unwrap_err();
        assert_eq!(err.raw, "not json");
        assert!(err.message().contains("not json"));
        assert!(err.message().starts_with("Parse error:"));
    }

    #[test]
    fn test_extract_empty_fence_fails() {
        assert!(extract_json("```json\n```").is_err());
        assert!(extract_json("").is_err());
    }

    #[test]
    fn test_parse_classification() {
        let c = parse_classification(r#"{"type": "question", "reason": "ends with a question mark"}"#).unwrap();
        assert_eq!(c.category, Category::Question);
        assert_eq!(c.reason, "ends with a question mark");
    }

    #[test]
    fn test_parse_classification_unrecognised_label() {
        let c = parse_classification(r#"{"type": "opinion", "reason": "personal view"}"#).unwrap();
        assert_eq!(c.category, Category::Unknown);
        assert!(c.reason.contains("opinion"));
        assert!(c.reason.contains("personal view"));
    }

    #[test]
    fn test_parse_classification_model_cannot_claim_error() {
        let c = parse_classification(r#"{"type": "Error", "reason": "cannot tell"}"#).unwrap();
        assert_eq!(c.category, Category::Unknown);
        assert!(c.reason.contains("'Error'"));
        assert!(c.reason.contains("cannot tell"));

        let c = parse_classification(r#"{"type": "unknown", "reason": "ambiguous"}"#).unwrap();
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.reason, "ambiguous");
    }

    #[test]
    fn test_parse_classification_missing_field() {
        let err = parse_classification(r#"{"type": "claim"}"#).unwrap_err();
        assert!(err.cause.contains("reason"));

        let err = parse_classification(r#"["claim"]"#).unwrap_err();
        assert!(err.cause.contains("object"));
    }

    #[test]
    fn test_parse_fact_check() {
        let fc = parse_fact_check("```json\n{\"score\": 5, \"explanation\": \"false\"}\n```").unwrap();
        assert_eq!(fc.score, Some(5));
        assert_eq!(fc.explanation, "false");
    }

    #[test]
    fn test_parse_fact_check_score_forms() {
        let cases = [
            (r#"{"score": 87.6, "explanation": "e"}"#, Some(88)),
            (r#"{"score": "40", "explanation": "e"}"#, Some(40)),
            (r#"{"score": "75%", "explanation": "e"}"#, Some(75)),
            (r#"{"score": 150, "explanation": "e"}"#, Some(100)),
            (r#"{"score": -3, "explanation": "e"}"#, Some(0)),
            (r#"{"score": null, "explanation": "e"}"#, None),
            (r#"{"explanation": "e"}"#, None),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_fact_check(raw).unwrap().score, expected, "{}", raw);
        }
    }

    #[test]
    fn test_parse_fact_check_invalid_score() {
        let err = parse_fact_check(r#"{"score": "high", "explanation": "e"}"#).unwrap_err();
        assert!(err.cause.contains("score"));
    }

    #[test]
    fn test_parse_fact_check_missing_explanation() {
        assert!(parse_fact_check(r#"{"score": 50}"#).is_err());
    }
}
