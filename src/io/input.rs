use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::ProviderTranscript;

/// Read a transcript input file into a ProviderTranscript
pub fn read_transcript_file(path: &Path) -> Result<ProviderTranscript> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_transcript_input(&content)
}

/// Parse transcript input: a provider JSON export, or plain transcript text.
///
/// Content whose first non-whitespace character is `{` is treated as a
/// provider export and must parse; anything else is taken verbatim as the
/// transcript text with no timed segments.
pub fn parse_transcript_input(content: &str) -> Result<ProviderTranscript> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail!("Transcript input is empty");
    }

    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).context("Failed to parse provider transcript JSON");
    }

    Ok(ProviderTranscript {
        text: trimmed.to_string(),
        segments: vec![],
        language: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_json_input() {
        let json = r#"{
            "text": "Hello, thanks for calling. Hi, I need a refill.",
            "language": "en-US",
            "segments": [
                {"text": "Hello, thanks for calling.", "start": 0.0, "end": 2.1, "speaker": "agent"},
                {"text": "Hi, I need a refill.", "start": 2.3, "end": 4.0, "speaker": "customer"}
            ]
        }"#;

        let transcript = parse_transcript_input(json).unwrap();
        assert!(transcript.has_segments());
        assert_eq!(transcript.language.as_deref(), Some("en-US"));
    }

    #[test]
    fn test_parse_plain_text_input() {
        let transcript =
            parse_transcript_input("Thank you for calling. I need to check on my refill.\n")
                .unwrap();

        assert!(!transcript.has_segments());
        assert!(transcript.language.is_none());
        assert_eq!(
            transcript.text,
            "Thank you for calling. I need to check on my refill."
        );
    }

    #[test]
    fn test_malformed_json_is_an_error_not_text() {
        let result = parse_transcript_input(r#"{"text": "truncated"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse_transcript_input("   \n  ").is_err());
    }

    #[test]
    fn test_read_transcript_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.txt");
        std::fs::write(&path, "Agent speaking. How can I help?").unwrap();

        let transcript = read_transcript_file(&path).unwrap();
        assert_eq!(transcript.text, "Agent speaking. How can I help?");

        assert!(read_transcript_file(&dir.path().join("missing.txt")).is_err());
    }
}
