//! Pulling structured results out of model responses.

use crate::ai::gemini::types::{FunctionCall, GenerateContentResponse, Part};
use crate::detection::Timecode;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Return the body of a Markdown code fence, or the trimmed input when the
/// text is not fenced. The opening fence may carry a language tag
/// (```` ```json ````); a missing closing fence is tolerated.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        // Single-line fence such as ```json[1,2]```; a bare word like
        // ```true``` is the payload, not a language tag.
        None => {
            let tag_len = after_open
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(after_open.len());
            let rest = &after_open[tag_len..];
            if tag_len > 0 && rest.trim_start().starts_with(|c: char| c == '[' || c == '{') {
                rest
            } else {
                after_open
            }
        }
    };

    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse model output as JSON, unwrapping a code fence first if present.
pub fn parse_model_json(text: &str) -> Result<Value> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(Error::MalformedOutput("model returned no content".to_string()));
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Model output is not valid JSON: {}\nOutput: {}", e, text);
        Error::MalformedOutput(format!("model output is not valid JSON: {}", e))
    })
}

/// Text of the first candidate's first non-thought text part.
pub fn first_text(response: &GenerateContentResponse) -> Option<&str> {
    response
        .parts()
        .iter()
        .filter(|p| p.get("thought").and_then(Value::as_bool) != Some(true))
        .find_map(|p| p.get("text").and_then(Value::as_str))
}

/// Extract and parse the JSON payload of a text response.
pub fn response_json(response: &GenerateContentResponse) -> Result<Value> {
    let text = first_text(response)
        .ok_or_else(|| Error::MalformedOutput("response contained no text part".to_string()))?;
    parse_model_json(text)
}

pub fn function_call(response: &GenerateContentResponse) -> Option<FunctionCall> {
    response.first_parts().into_iter().find_map(|p| match p {
        Part::FunctionCall { function_call } => Some(function_call),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct TimecodeArgs {
    #[serde(default)]
    timecodes: Vec<Timecode>,
}

/// Decode the `timecodes` argument of a `set_timecodes*` function call.
///
/// Models sometimes escape apostrophes in their argument strings; those are
/// restored so the captions render as written.
pub fn timecodes(call: &FunctionCall) -> Result<Vec<Timecode>> {
    let args: TimecodeArgs = serde_json::from_value(call.args.clone()).map_err(|e| {
        Error::MalformedOutput(format!("invalid arguments for {}: {}", call.name, e))
    })?;

    Ok(args
        .timecodes
        .into_iter()
        .map(|mut t| {
            t.text = t.text.replace("\\'", "'");
            t
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockContentClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_fenced_json_parses() {
        assert_eq!(parse_model_json("```json\n[1,2]\n```").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_unfenced_json_parses_unchanged() {
        assert_eq!(parse_model_json("[1,2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n[]\n```  \n"), "[]");
        assert_eq!(strip_code_fence("```json\n[3]"), "[3]");
        assert_eq!(strip_code_fence("Here you go:\n```json\n[4]\n```\nDone."), "[4]");
        assert_eq!(strip_code_fence("```json[5]```"), "[5]");
        assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("plain"), "plain");
    }

    #[test]
    fn test_single_line_fence_keeps_bare_literals() {
        assert_eq!(strip_code_fence("```true```"), "true");
        assert_eq!(parse_model_json("```null```").unwrap(), Value::Null);
        assert_eq!(parse_model_json("```42```").unwrap(), json!(42));
    }

    #[test]
    fn test_first_text_skips_thoughts() {
        let response = GenerateContentResponse::new(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Let me look at the image", "thought": true },
                        { "text": "[1]" }
                    ]
                }
            }]
        }));
        assert_eq!(first_text(&response), Some("[1]"));
    }

    #[test]
    fn test_malformed_output_errors() {
        assert!(matches!(
            parse_model_json("```json\nnot json\n```"),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(parse_model_json("   "), Err(Error::MalformedOutput(_))));
    }

    #[test]
    fn test_response_json_requires_text_part() {
        let response = GenerateContentResponse::default();
        assert!(matches!(
            response_json(&response),
            Err(Error::MalformedOutput(_))
        ));

        let response = MockContentClient::text_response("```json\n[{\"label\":\"cat\"}]\n```");
        assert_eq!(response_json(&response).unwrap(), json!([{ "label": "cat" }]));
    }

    #[test]
    fn test_timecodes_unescape_apostrophes() {
        let call = FunctionCall {
            name: "set_timecodes".to_string(),
            args: json!({
                "timecodes": [
                    { "time": "00:01", "text": "It\\'s a cat" },
                    { "time": "00:05", "text": "Dog", "objects": ["dog"] }
                ]
            }),
        };

        let timecodes = timecodes(&call).unwrap();
        assert_eq!(timecodes.len(), 2);
        assert_eq!(timecodes[0].text, "It's a cat");
        assert_eq!(timecodes[1].objects, Some(vec!["dog".to_string()]));
    }

    #[test]
    fn test_function_call_lookup() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Calling now" },
                        { "functionCall": { "name": "set_timecodes_with_numeric_values", "args": {} } }
                    ]
                }
            }]
        }))
        .unwrap();

        let call = function_call(&response).unwrap();
        assert_eq!(call.name, "set_timecodes_with_numeric_values");
        assert!(timecodes(&call).unwrap().is_empty());
    }
}
