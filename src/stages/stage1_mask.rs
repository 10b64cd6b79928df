use std::collections::HashMap;

use tracing::{info, warn};

use crate::llm::{
    build_masking_system_prompt, build_masking_user_prompt, join_speaker_labeled,
    CompletionClient, PiiCategory, DEFAULT_PII_CATEGORIES,
};
use crate::models::{MaskingMetadata, Transcription, TranscriptionSegment};

/// Configuration for the masking stage
#[derive(Debug, Clone)]
pub struct MaskingConfig {
    /// PII categories sent with every masking request
    pub categories: Vec<PiiCategory>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_PII_CATEGORIES.to_vec(),
        }
    }
}

/// Result of the masking stage
#[derive(Debug)]
pub struct MaskingResult {
    /// How the masked view was produced (also attached to the transcription)
    pub metadata: MaskingMetadata,
    /// Segment indices reverted to their unmasked text on misalignment
    pub reverted_indices: Vec<usize>,
    /// True when the masking request failed and the text was left unmasked
    pub request_failed: bool,
}

/// Execute masking: produce a privacy-safe parallel view of the transcript.
///
/// 1. Join segments into `Speaker: text` entries separated by blank lines
/// 2. Ask the masking model to redact PII in place, preserving structure
/// 3. Realign the reply onto the original segments, keeping every speaker
///    and timestamp; any entry the model misaligned reverts to unmasked text
/// 4. Count bracket tags in the masked text for the masking metadata
///
/// Masking is best-effort: a failed request attaches the original text
/// unmasked with an error marker in the metadata, never an error.
pub async fn mask_transcription(
    client: &dyn CompletionClient,
    transcription: &mut Transcription,
    config: &MaskingConfig,
) -> MaskingResult {
    let joined = join_speaker_labeled(&transcription.segments);
    let system = build_masking_system_prompt();
    let user = build_masking_user_prompt(&joined, &config.categories);

    let reply = match client.complete(&system, &user).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Masking request failed, keeping text unmasked: {}", e);
            let metadata = MaskingMetadata::error();
            transcription.attach_masked_view(
                transcription.full_text.clone(),
                transcription.segments.clone(),
                metadata.clone(),
            );
            return MaskingResult {
                metadata,
                reverted_indices: Vec::new(),
                request_failed: true,
            };
        }
    };

    let (masked_segments, reverted_indices) = realign_masked_reply(&transcription.segments, &reply);
    if !reverted_indices.is_empty() {
        warn!(
            "Masking reply misaligned: {} of {} segments reverted to unmasked text",
            reverted_indices.len(),
            transcription.segments.len()
        );
    }

    let masked_full_text = masked_segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let metadata = MaskingMetadata {
        model: client.model_name().to_string(),
        category_counts: count_bracket_tags(&masked_full_text),
    };

    info!(
        "Masked call {}: {} replacements across {} categories",
        transcription.call_id,
        metadata.total_replacements(),
        metadata.category_counts.len()
    );

    transcription.attach_masked_view(masked_full_text, masked_segments, metadata.clone());

    MaskingResult {
        metadata,
        reverted_indices,
        request_failed: false,
    }
}

/// Pair the model's blank-line-delimited reply back onto the original
/// segments.
///
/// Entries pair in order, but only when the speaker prefix matches the
/// original segment; on a mismatch the segment keeps its unmasked text and
/// the same reply entry is retried for the next segment, so one fused or
/// dropped entry costs exactly one segment rather than shifting the rest.
fn realign_masked_reply(
    segments: &[TranscriptionSegment],
    reply: &str,
) -> (Vec<TranscriptionSegment>, Vec<usize>) {
    let normalized = reply.replace("\r\n", "\n");
    let parts: Vec<&str> = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut masked = Vec::with_capacity(segments.len());
    let mut reverted = Vec::new();
    let mut next_part = 0usize;

    for (i, segment) in segments.iter().enumerate() {
        let masked_text = parts
            .get(next_part)
            .and_then(|part| masked_text_for(part, segment.speaker.label()));

        match masked_text {
            Some(text) => {
                masked.push(TranscriptionSegment::new(
                    segment.speaker,
                    text,
                    segment.start_time,
                    segment.end_time,
                    segment.confidence,
                ));
                next_part += 1;
            }
            None => {
                reverted.push(i);
                masked.push(segment.clone());
            }
        }
    }

    (masked, reverted)
}

/// The masked text of one reply entry, if its speaker prefix matches
fn masked_text_for<'a>(part: &'a str, expected_speaker: &str) -> Option<&'a str> {
    let (prefix, rest) = part.split_once(':')?;
    if prefix.trim().eq_ignore_ascii_case(expected_speaker) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Count `[CATEGORY_TAG]` occurrences in masked text, folding numeric
/// suffixes ([PATIENT_NAME_2] counts toward PATIENT_NAME)
fn count_bracket_tags(text: &str) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else { break };
        let inner = &rest[..close];
        if is_category_tag(inner) {
            *counts.entry(base_category(inner).to_string()).or_insert(0) += 1;
        }
        rest = &rest[close + 1..];
    }

    counts
}

fn is_category_tag(inner: &str) -> bool {
    inner.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && inner
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn base_category(inner: &str) -> &str {
    match inner.rsplit_once('_') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Speaker;
    use anyhow::anyhow;
    use std::future::Future;
    use std::pin::Pin;

    struct ScriptedClient {
        reply: String,
    }

    impl CompletionClient for ScriptedClient {
        fn complete<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            Box::pin(async move { Ok(self.reply.clone()) })
        }

        fn model_name(&self) -> &str {
            "mock-masker"
        }
    }

    struct FailingClient;

    impl CompletionClient for FailingClient {
        fn complete<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }

        fn model_name(&self) -> &str {
            "mock-masker"
        }
    }

    fn sample_transcription() -> Transcription {
        let segments = vec![
            TranscriptionSegment::new(Speaker::Agent, "Hello, am I speaking with John Smith?", 0.0, 3.5, 0.9),
            TranscriptionSegment::new(Speaker::Customer, "Yes, my number is 555-0147.", 3.5, 6.0, 0.9),
            TranscriptionSegment::new(Speaker::Agent, "Thank you for confirming.", 6.0, 7.5, 0.9),
        ];
        Transcription::new("call-1", "en-US", "Hello, am I speaking with John Smith? Yes, my number is 555-0147. Thank you for confirming.", segments)
    }

    #[tokio::test]
    async fn test_masked_segments_pair_with_originals() {
        let client = ScriptedClient {
            reply: "Agent: Hello, am I speaking with [PATIENT_NAME]?\n\nCustomer: Yes, my number is [PHONE_NUMBER].\n\nAgent: Thank you for confirming.".to_string(),
        };
        let mut transcription = sample_transcription();

        let result = mask_transcription(&client, &mut transcription, &MaskingConfig::default()).await;

        assert!(!result.request_failed);
        assert!(result.reverted_indices.is_empty());

        let masked = transcription.masked_segments.as_ref().unwrap();
        assert_eq!(masked.len(), transcription.segments.len());
        for (original, masked) in transcription.segments.iter().zip(masked.iter()) {
            assert_eq!(original.speaker, masked.speaker);
            assert_eq!(original.start_time, masked.start_time);
            assert_eq!(original.end_time, masked.end_time);
        }
        assert_eq!(masked[0].text, "Hello, am I speaking with [PATIENT_NAME]?");
        assert_eq!(result.metadata.category_counts["PATIENT_NAME"], 1);
        assert_eq!(result.metadata.category_counts["PHONE_NUMBER"], 1);
        assert_eq!(result.metadata.model, "mock-masker");
    }

    #[tokio::test]
    async fn test_missing_separator_reverts_only_affected_segment() {
        // The first two entries are fused by a missing blank line; the
        // third arrives intact.
        let client = ScriptedClient {
            reply: "Agent: Hello, am I speaking with [PATIENT_NAME]?\nCustomer: Yes, my number is [PHONE_NUMBER].\n\nAgent: Thank you for confirming.".to_string(),
        };
        let mut transcription = sample_transcription();

        let result = mask_transcription(&client, &mut transcription, &MaskingConfig::default()).await;

        assert_eq!(result.reverted_indices, vec![1]);
        let masked = transcription.masked_segments.as_ref().unwrap();
        assert_eq!(masked.len(), 3);
        assert!(masked[0].text.contains("[PATIENT_NAME]"));
        assert_eq!(masked[1].text, transcription.segments[1].text);
        assert_eq!(masked[2].text, "Thank you for confirming.");
    }

    #[tokio::test]
    async fn test_request_failure_keeps_text_unmasked() {
        let mut transcription = sample_transcription();

        let result = mask_transcription(&FailingClient, &mut transcription, &MaskingConfig::default()).await;

        assert!(result.request_failed);
        assert_eq!(result.metadata.model, "none - error occurred");
        assert_eq!(result.metadata.total_replacements(), 0);

        let masked = transcription.masked_segments.as_ref().unwrap();
        assert_eq!(masked.len(), transcription.segments.len());
        assert_eq!(masked[0].text, transcription.segments[0].text);
        assert_eq!(transcription.masked_full_text.as_deref(), Some(transcription.full_text.as_str()));
    }

    #[test]
    fn test_bracket_tag_counting_folds_numeric_suffixes() {
        let counts = count_bracket_tags(
            "[PATIENT_NAME_1] spoke to [PATIENT_NAME_2], then [PATIENT_NAME_1] again; DOB [DATE_OF_BIRTH]",
        );
        assert_eq!(counts["PATIENT_NAME"], 3);
        assert_eq!(counts["DATE_OF_BIRTH"], 1);
    }

    #[test]
    fn test_bracket_tag_counting_ignores_prose_brackets() {
        let counts = count_bracket_tags("see [inaudible] and [Note 3] but mask [SSN]");
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["SSN"], 1);
    }
}
