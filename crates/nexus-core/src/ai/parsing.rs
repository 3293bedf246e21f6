//! JSON parsing helpers for AI provider responses
//!
//! Model output often wraps the JSON payload in prose or markdown fences.
//! These functions try the whole text first, then the outermost embedded
//! object or array.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Instruction appended when a provider has no native JSON mode
pub const JSON_ONLY_INSTRUCTION: &str = "Respond with valid JSON only.";

/// Append the JSON-only instruction (and the schema, when given) to a prompt
pub fn with_json_instruction(prompt: &str, schema_hint: Option<&serde_json::Value>) -> String {
    match schema_hint {
        Some(schema) => format!(
            "{}\n\n{}\nThe JSON must match this schema:\n{}",
            prompt, JSON_ONLY_INSTRUCTION, schema
        ),
        None => format!("{}\n\n{}", prompt, JSON_ONLY_INSTRUCTION),
    }
}

/// Parse a model response into `T`
///
/// The full trimmed text is tried first. Failing that, each embedded
/// candidate span (first `{` to last `}`, first `[` to last `]`) is tried in
/// order of appearance, and the first one that deserializes wins.
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T> {
    let response = response.trim();

    if let Ok(value) = serde_json::from_str::<T>(response) {
        return Ok(value);
    }

    let spans = json_spans(response);
    let mut first_err = None;
    for span in &spans {
        match serde_json::from_str::<T>(span) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_err.get_or_insert_with(|| {
                    Error::InvalidData(format!(
                        "Invalid JSON from AI: {} | Raw: {}",
                        e,
                        truncate(span)
                    ))
                });
            }
        }
    }

    Err(first_err.unwrap_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncate(response)
        ))
    }))
}

/// Candidate JSON object and array spans, earliest opener first
fn json_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (start < end).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}

/// Truncate long responses for error messages
fn truncate(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

fn dollar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([0-9,]+\.?\d*)").expect("valid regex"))
}

/// First `$<number>` amount in free text, commas stripped
pub fn extract_dollar_amount(text: &str) -> Option<f64> {
    dollar_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        #[serde(rename = "productName")]
        product_name: String,
        #[serde(rename = "estimatedPrice")]
        estimated_price: f64,
    }

    #[test]
    fn test_parse_plain_json() {
        let result: Product =
            parse_json(r#"{"productName": "Kettle", "estimatedPrice": 39.99}"#).unwrap();
        assert_eq!(result.product_name, "Kettle");
        assert_eq!(result.estimated_price, 39.99);
    }

    #[test]
    fn test_parse_json_with_prose_and_fence() {
        let response = r#"Here's what I found:
```json
{"productName": "Espresso Machine", "estimatedPrice": 249.0}
```
Let me know if you need more."#;
        let result: Product = parse_json(response).unwrap();
        assert_eq!(result.product_name, "Espresso Machine");
    }

    #[test]
    fn test_parse_top_level_array() {
        let response = "Budgets: [1, 2, 3] done";
        let result: Vec<u32> = parse_json(response).unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn test_object_containing_array_uses_object() {
        let response = r#"Sure! {"budgets": [{"category": "Food"}]}"#;
        let value: serde_json::Value = parse_json(response).unwrap();
        assert_eq!(value["budgets"][0]["category"], "Food");
    }

    #[test]
    fn test_bracketed_aside_before_object() {
        let response = "Product [high confidence]:\n{\"productName\": \"Kettle\", \"estimatedPrice\": 40}";
        let result: Product = parse_json(response).unwrap();
        assert_eq!(result.product_name, "Kettle");
        assert_eq!(result.estimated_price, 40.0);
    }

    #[test]
    fn test_braced_aside_before_array() {
        let response = "Here {as requested}: [4, 5]";
        let result: Vec<u32> = parse_json(response).unwrap();
        assert_eq!(result, vec![4, 5]);
    }

    #[test]
    fn test_parse_no_json() {
        let result: Result<Product> = parse_json("I cannot help with that.");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
    }

    #[test]
    fn test_parse_error_truncates_raw() {
        let long = format!("{{\"productName\": \"{}\" oops}}", "x".repeat(500));
        let err = parse_json::<Product>(&long).unwrap_err().to_string();
        assert!(err.contains("..."));
        assert!(err.len() < 400);
    }

    #[test]
    fn test_with_json_instruction() {
        assert_eq!(
            with_json_instruction("List budgets", None),
            "List budgets\n\nRespond with valid JSON only."
        );
        let schema = serde_json::json!({"type": "object"});
        let prompt = with_json_instruction("List budgets", Some(&schema));
        assert!(prompt.contains("schema"));
        assert!(prompt.contains("\"object\""));
    }

    #[test]
    fn test_extract_dollar_amount() {
        assert_eq!(
            extract_dollar_amount("Currently retails for $1,299.99 at most stores"),
            Some(1299.99)
        );
        assert_eq!(extract_dollar_amount("About $45 on sale, was $60"), Some(45.0));
        assert_eq!(extract_dollar_amount("No price information available"), None);
    }
}
