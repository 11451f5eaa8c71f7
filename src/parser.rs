use crate::models::ParsedPrediction;
use serde_json::Value;

const FENCE: &str = "```";

/// Strip a surrounding markdown code fence, with or without a language tag.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Decode a model reply into a prediction.
///
/// The reply must be exactly one JSON object once fences are removed. Missing
/// keys are tolerated and come back as `None`; anything that fails to decode
/// yields an invalid prediction with both fields absent.
pub fn parse_reply(raw: &str) -> ParsedPrediction {
    let parsed: Value = match serde_json::from_str(strip_fences(raw)) {
        Ok(value) => value,
        Err(_) => return ParsedPrediction::invalid(),
    };

    let Some(object) = parsed.as_object() else {
        return ParsedPrediction::invalid();
    };

    ParsedPrediction {
        predicted_stars: object.get("predicted_stars").and_then(extract_stars),
        explanation: object.get("explanation").and_then(extract_explanation),
        is_valid: true,
    }
}

/// Integers, integral floats and numeric strings all count as a rating
fn extract_stars(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn extract_explanation(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{"predicted_stars": 4, "explanation": "Mostly positive"}"#;

    #[test]
    fn test_strip_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_other_tag_and_surrounding_whitespace() {
        let input = "  \n```JSON\n{\"key\": 1}\n```  \n";
        assert_eq!(strip_fences(input), "{\"key\": 1}");
    }

    #[test]
    fn test_strip_fences_no_fences() {
        assert_eq!(strip_fences(CLEAN), CLEAN);
    }

    #[test]
    fn test_parse_clean_reply() {
        let parsed = parse_reply(CLEAN);
        assert!(parsed.is_valid);
        assert_eq!(parsed.predicted_stars, Some(4));
        assert_eq!(parsed.explanation.as_deref(), Some("Mostly positive"));
    }

    #[test]
    fn test_parse_fenced_reply() {
        let fenced = format!("```json\n{CLEAN}\n```");
        assert_eq!(parse_reply(&fenced), parse_reply(CLEAN));
    }

    #[test]
    fn test_parse_is_idempotent_over_stripping() {
        for raw in [
            CLEAN.to_string(),
            format!("```json\n{CLEAN}\n```"),
            format!("```\n{CLEAN}```"),
            "not json".to_string(),
            "```json\nnot json\n```".to_string(),
            String::new(),
        ] {
            assert_eq!(parse_reply(&raw), parse_reply(strip_fences(&raw)), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_malformed_reply() {
        for raw in ["not json", "I think 5 stars", "", "```", "{\"predicted_stars\": 4"] {
            let parsed = parse_reply(raw);
            assert!(!parsed.is_valid, "{raw:?} should be invalid");
            assert_eq!(parsed.predicted_stars, None);
            assert_eq!(parsed.explanation, None);
        }
    }

    #[test]
    fn test_parse_rejects_non_object_json() {
        assert!(!parse_reply("[1, 2, 3]").is_valid);
        assert!(!parse_reply("5").is_valid);
        assert!(!parse_reply("\"five\"").is_valid);
    }

    #[test]
    fn test_parse_rejects_trailing_text() {
        let parsed = parse_reply(&format!("{CLEAN} Hope this helps!"));
        assert!(!parsed.is_valid);
    }

    #[test]
    fn test_parse_tolerates_missing_keys() {
        let parsed = parse_reply(r#"{"explanation": "No rating given"}"#);
        assert!(parsed.is_valid);
        assert_eq!(parsed.predicted_stars, None);
        assert_eq!(parsed.explanation.as_deref(), Some("No rating given"));

        let parsed = parse_reply("{}");
        assert!(parsed.is_valid);
        assert_eq!(parsed, ParsedPrediction { is_valid: true, ..Default::default() });
    }

    #[test]
    fn test_parse_lenient_star_shapes() {
        assert_eq!(parse_reply(r#"{"predicted_stars": 2.0}"#).predicted_stars, Some(2));
        assert_eq!(parse_reply(r#"{"predicted_stars": " 3 "}"#).predicted_stars, Some(3));
        assert_eq!(parse_reply(r#"{"predicted_stars": 2.5}"#).predicted_stars, None);
        // Fractional ratings are not truncated; the row stays valid without a rating
        let parsed = parse_reply(r#"{"predicted_stars": 4.5, "explanation": "mostly good"}"#);
        assert!(parsed.is_valid);
        assert_eq!(parsed.predicted_stars, None);
        assert_eq!(parse_reply(r#"{"predicted_stars": "four"}"#).predicted_stars, None);
        assert_eq!(parse_reply(r#"{"predicted_stars": null}"#).predicted_stars, None);
    }

    #[test]
    fn test_parse_non_string_explanation() {
        let parsed = parse_reply(r#"{"predicted_stars": 1, "explanation": ["cold", "slow"]}"#);
        assert_eq!(parsed.explanation.as_deref(), Some(r#"["cold","slow"]"#));

        let parsed = parse_reply(r#"{"predicted_stars": 1, "explanation": null}"#);
        assert_eq!(parsed.explanation, None);
    }
}
