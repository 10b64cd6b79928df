use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the call a segment is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Customer,
}

impl Speaker {
    /// Label used in prompts and joined transcript text
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Customer => "Customer",
        }
    }

    /// The other party on the call
    pub fn other(&self) -> Speaker {
        match self {
            Speaker::Agent => Speaker::Customer,
            Speaker::Customer => Speaker::Agent,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A timestamped, speaker-attributed span of transcript text
///
/// Segments are kept in insertion order, which is chronological order.
/// `start_time <= end_time` always holds for a single segment; segments are
/// NOT guaranteed to tile the time axis (they may come from sentence-split
/// heuristics rather than true diarization).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionSegment {
    /// Speaker the span is attributed to
    pub speaker: Speaker,
    /// The spoken text; never altered after creation except by masking
    pub text: String,
    /// Start offset in seconds from the beginning of the call
    pub start_time: f64,
    /// End offset in seconds, >= start_time
    pub end_time: f64,
    /// Transcription accuracy confidence (0-1)
    pub confidence: f64,
}

impl TranscriptionSegment {
    pub fn new(speaker: Speaker, text: impl Into<String>, start_time: f64, end_time: f64, confidence: f64) -> Self {
        Self {
            speaker,
            text: text.into(),
            start_time,
            end_time: end_time.max(start_time),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Duration of this segment in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Number of whitespace-delimited words in the segment text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Record of one masking pass over a transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskingMetadata {
    /// Model that produced the masked text, or "none - error occurred"
    /// when the masking request failed and the text was left unmasked
    pub model: String,
    /// How many bracket-tag instances were replaced, per PII category
    /// (counted over the masked text, not the original)
    #[serde(default)]
    pub category_counts: HashMap<String, usize>,
}

impl MaskingMetadata {
    /// Metadata recorded when the masking request itself failed
    pub fn error() -> Self {
        Self {
            model: "none - error occurred".to_string(),
            category_counts: HashMap::new(),
        }
    }

    /// Total replaced instances across all categories
    pub fn total_replacements(&self) -> usize {
        self.category_counts.values().sum()
    }
}

/// A call transcript: ordered segments, their concatenated text, and an
/// optional privacy-safe parallel view attached by the masking stage
///
/// Immutable once persisted except for re-runs that fully replace it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    /// Unique identifier (UUID)
    pub id: String,
    /// Call this transcript belongs to
    pub call_id: String,
    /// BCP-47 language tag the provider transcribed in
    pub language: String,
    /// Concatenated text of all segments
    pub full_text: String,
    /// Ordered segments; insertion order = chronological order
    pub segments: Vec<TranscriptionSegment>,
    /// Privacy-safe text, present after the masking stage ran
    #[serde(default)]
    pub masked_full_text: Option<String>,
    /// Masked view of `segments`: identical length, speakers, and time axis
    #[serde(default)]
    pub masked_segments: Option<Vec<TranscriptionSegment>>,
    /// How the masked view was produced
    #[serde(default)]
    pub masking: Option<MaskingMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Transcription {
    pub fn new(
        call_id: impl Into<String>,
        language: impl Into<String>,
        full_text: impl Into<String>,
        segments: Vec<TranscriptionSegment>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            language: language.into(),
            full_text: full_text.into(),
            segments,
            masked_full_text: None,
            masked_segments: None,
            masking: None,
            created_at: Utc::now(),
        }
    }

    /// Total duration in seconds (end of the last segment)
    pub fn duration_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end_time).unwrap_or(0.0)
    }

    /// Attach (or replace) the masked view produced by the masking stage
    pub fn attach_masked_view(
        &mut self,
        masked_full_text: String,
        masked_segments: Vec<TranscriptionSegment>,
        masking: MaskingMetadata,
    ) {
        self.masked_full_text = Some(masked_full_text);
        self.masked_segments = Some(masked_segments);
        self.masking = Some(masking);
    }

    /// The text the analysis stage should see: masked when available
    pub fn analysis_segments(&self) -> &[TranscriptionSegment] {
        self.masked_segments.as_deref().unwrap_or(&self.segments)
    }

    /// Flat analysis text: the masked full text when available
    pub fn analysis_text(&self) -> &str {
        self.masked_full_text.as_deref().unwrap_or(&self.full_text)
    }
}
