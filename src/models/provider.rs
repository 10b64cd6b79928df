use serde::{Deserialize, Serialize};

/// Response shape returned by the transcription provider
///
/// Only `text` is guaranteed. Providers that diarize also return timed
/// segments; when those are absent the pipeline falls back to heuristic
/// sentence segmentation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderTranscript {
    /// Full transcribed text
    pub text: String,
    /// Timed segments, when the provider supplies them
    #[serde(default)]
    pub segments: Vec<ProviderSegment>,
    /// Language the provider transcribed in
    #[serde(default)]
    pub language: Option<String>,
}

/// A single segment from the provider with optional speaker/confidence info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSegment {
    /// The recognized text
    pub text: String,
    /// Start timestamp in seconds
    pub start: f64,
    /// End timestamp in seconds
    pub end: f64,
    /// Speaker label ("agent"/"customer"); alternation is applied when absent
    #[serde(default)]
    pub speaker: Option<String>,
    /// Transcription accuracy (0-1), only from providers that score segments
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ProviderTranscript {
    /// Whether the provider returned usable timed segments
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }
}
