use serde_json::Value;

/// Extract and parse the first JSON object from a model reply.
///
/// Model replies are not guaranteed to be pure JSON: they may carry leading
/// prose, Markdown code fences, or trailing commentary. Recovery is applied
/// in order of increasing permissiveness:
/// 1. the first balanced `{...}` span,
/// 2. everything between the first `{` and the last `}`,
/// 3. both of the above after stripping code-fence markers.
///
/// Returns `None` when no candidate parses as a JSON object; callers treat
/// that as a fallback transition, never an error.
pub fn extract_json_object(reply: &str) -> Option<Value> {
    if let Some(value) = try_candidates(reply) {
        return Some(value);
    }

    let stripped = strip_code_fences(reply);
    if stripped != reply {
        return try_candidates(&stripped);
    }

    None
}

fn try_candidates(text: &str) -> Option<Value> {
    if let Some(span) = balanced_object_span(text) {
        if let Some(value) = parse_object(span) {
            return Some(value);
        }
    }

    if let Some(span) = outermost_brace_span(text) {
        if let Some(value) = parse_object(span) {
            return Some(value);
        }
    }

    None
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// The first `{...}` span with balanced braces, honoring JSON string
/// escaping so braces inside quoted text do not count.
fn balanced_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Everything between the first `{` and the last `}`, for replies where the
/// model truncated or unbalanced its braces inside strings.
fn outermost_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end { Some(&text[start..=end]) } else { None }
}

/// Drop Markdown code-fence marker lines (``` and ```json) wholesale.
fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare_object() {
        let reply = r#"{"sentiment": {"overallScore": 72}}"#;
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["sentiment"]["overallScore"], 72);
    }

    #[test]
    fn test_extract_with_prose_and_fences() {
        let reply = "Here is the analysis you asked for:\n```json\n{\"sentiment\": {\"overallScore\": 55}}\n```\nLet me know if you need more.";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["sentiment"]["overallScore"], 55);
    }

    #[test]
    fn test_extract_ignores_braces_inside_strings() {
        let reply = r#"Sure: {"callSummary": "caller said {literally} this", "disposition": "refill"} done"#;
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["disposition"], "refill");
    }

    #[test]
    fn test_outermost_brace_span() {
        assert_eq!(outermost_brace_span("ab {1} cd"), Some("{1}"));
        assert_eq!(outermost_brace_span("{\"a\": 1} tail"), Some("{\"a\": 1}"));
        assert_eq!(outermost_brace_span("} reversed {"), None);
        assert_eq!(outermost_brace_span("no braces"), None);
    }

    #[test]
    fn test_extract_nested_objects() {
        let reply = r#"prefix {"a": {"b": {"c": 1}}, "d": [1, 2]} suffix"#;
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["a"]["b"]["c"], 1);
    }

    #[test]
    fn test_extract_rejects_non_object() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("no json here at all").is_none());
    }

    #[test]
    fn test_extract_rejects_truncated_json() {
        let reply = r#"{"sentiment": {"overallScore": 72"#;
        assert!(extract_json_object(reply).is_none());
    }

    #[test]
    fn test_strip_code_fences() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_fenced_object_with_inner_fence_line() {
        let reply = "```json\n{\n  \"callSummary\": \"ok\"\n}\n```";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["callSummary"], "ok");
    }
}
