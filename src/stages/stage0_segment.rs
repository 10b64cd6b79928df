use tracing::info;

use crate::models::{ProviderTranscript, Speaker, Transcription, TranscriptionSegment};

/// Configuration for transcript segmentation
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Estimated seconds of speech per word
    pub seconds_per_word: f64,
    /// Minimum duration assigned to any segment, in seconds
    pub min_segment_secs: f64,
    /// Confidence recorded when the provider supplies none
    pub default_confidence: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            seconds_per_word: 0.5,
            min_segment_secs: 1.0,
            default_confidence: 0.9,
        }
    }
}

/// Result of segmentation
#[derive(Debug)]
pub struct SegmentationResult {
    pub transcription: Transcription,
    /// True when timings came from the word-count estimate rather than the
    /// transcription provider
    pub timing_estimated: bool,
}

/// Turn a provider response into a timed, speaker-labeled `Transcription`.
///
/// When the provider supplied its own segments those are adopted as-is.
/// Otherwise the flat text is sentence-split and each sentence becomes a
/// segment with alternating speakers and estimated timings. Speaker
/// alternation is a declared approximation, not diarization; callers must
/// not treat the labels as ground truth.
pub fn segment_transcript(
    call_id: &str,
    provider: &ProviderTranscript,
    fallback_language: &str,
    config: &SegmenterConfig,
) -> SegmentationResult {
    let language = provider
        .language
        .clone()
        .unwrap_or_else(|| fallback_language.to_string());

    let (segments, timing_estimated) = if provider.has_segments() {
        (adopt_provider_segments(provider, config), false)
    } else {
        (segment_text(&provider.text, config), true)
    };

    info!(
        "Segmented call {}: {} segments ({})",
        call_id,
        segments.len(),
        if timing_estimated { "estimated timing" } else { "provider timing" }
    );

    SegmentationResult {
        transcription: Transcription::new(call_id, language, provider.text.trim(), segments),
        timing_estimated,
    }
}

/// Sentence-split flat text into segments with alternating speakers.
///
/// Each segment's duration is `max(min_segment_secs, words * seconds_per_word)`
/// accumulated on a running clock, so segment `i+1` starts exactly where
/// segment `i` ended.
pub fn segment_text(text: &str, config: &SegmenterConfig) -> Vec<TranscriptionSegment> {
    let mut segments = Vec::new();
    let mut speaker = Speaker::Agent;
    let mut clock = 0.0f64;

    for sentence in split_sentences(text) {
        let words = sentence.split_whitespace().count();
        let duration = (words as f64 * config.seconds_per_word).max(config.min_segment_secs);
        let start = clock;
        clock += duration;

        segments.push(TranscriptionSegment::new(
            speaker,
            sentence,
            start,
            clock,
            config.default_confidence,
        ));
        speaker = speaker.other();
    }

    segments
}

/// Split on `.`, `!`, `?` followed by whitespace (or end of text).
///
/// Deliberately naive: abbreviations like "Dr." split too. Decimal numbers
/// ("0.5mg") survive because the terminator is not followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Adopt segments the provider already timed, alternating speakers only
/// where the provider left them unlabeled
fn adopt_provider_segments(
    provider: &ProviderTranscript,
    config: &SegmenterConfig,
) -> Vec<TranscriptionSegment> {
    provider
        .segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let speaker = s
                .speaker
                .as_deref()
                .and_then(parse_speaker_label)
                .unwrap_or(if i % 2 == 0 { Speaker::Agent } else { Speaker::Customer });

            TranscriptionSegment::new(
                speaker,
                s.text.trim(),
                s.start,
                s.end,
                s.confidence.unwrap_or(config.default_confidence),
            )
        })
        .collect()
}

fn parse_speaker_label(label: &str) -> Option<Speaker> {
    match label.trim().to_lowercase().as_str() {
        "agent" | "0" => Some(Speaker::Agent),
        "customer" | "caller" | "1" => Some(Speaker::Customer),
        _ => None,
    }
}
