use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Model identifier stamped on analyses produced without a model call
pub const FALLBACK_MODEL: &str = "local-fallback";

/// Marker tag attached when the model replied but its output could not be
/// parsed and the analysis was rebuilt by the local fallback
pub const PARSING_ERROR_TAG: &str = "parsing_error";

/// One point on the sentiment timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    /// Seconds into the call
    #[serde(default)]
    pub time: f64,
    /// Sentiment score at that point (0-100)
    #[serde(default)]
    pub score: i64,
}

/// When an escalation happened: seconds into the call, or "unknown" when the
/// model could not anchor it to the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EscalationTime {
    Seconds(f64),
    Unknown(String),
}

impl EscalationTime {
    pub fn unknown() -> Self {
        EscalationTime::Unknown("unknown".to_string())
    }
}

impl Default for EscalationTime {
    fn default() -> Self {
        EscalationTime::unknown()
    }
}

/// A moment where the call escalated (raised voice, complaint, threat to
/// cancel, supervisor request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPoint {
    #[serde(default)]
    pub time: EscalationTime,
    /// What was said
    #[serde(default)]
    pub text: String,
    /// Why it is considered an escalation
    #[serde(default)]
    pub reason: String,
}

/// Sentiment facet of an analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentiment {
    /// Overall caller sentiment (0-100); 0 also encodes "no scoring available"
    #[serde(default)]
    pub overall_score: i64,
    #[serde(default)]
    pub timeline: Vec<SentimentPoint>,
    #[serde(default)]
    pub emotion_tags: Vec<String>,
    #[serde(default)]
    pub escalation_points: Vec<EscalationPoint>,
}

/// A drug the caller or agent referenced, with occurrence count and a short
/// context excerpt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugMention {
    pub name: String,
    /// Occurrences in the transcript, always >= 1
    #[serde(default = "default_mention_count")]
    pub count: i64,
    #[serde(default)]
    pub context: String,
}

fn default_mention_count() -> i64 {
    1
}

impl DrugMention {
    pub fn new(name: impl Into<String>, count: i64, context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: count.max(1),
            context: context.into(),
        }
    }
}

/// Clinical facet of an analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalSummary {
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub drug_mentions: Vec<DrugMention>,
    /// Free-text clinical context; mined by the heuristic drug extractor
    /// when `drug_mentions` came back empty
    #[serde(default)]
    pub clinical_context: String,
}

/// Agent performance facet; all scores are 0-100 integers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformance {
    #[serde(default)]
    pub communication_score: i64,
    #[serde(default)]
    pub adherence_to_protocol: i64,
    #[serde(default)]
    pub empathy_score: i64,
    #[serde(default)]
    pub efficiency_score: i64,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub effective_techniques: Vec<String>,
}

impl AgentPerformance {
    /// All four numeric scores, for range checks and aggregation
    pub fn scores(&self) -> [i64; 4] {
        [
            self.communication_score,
            self.adherence_to_protocol,
            self.empathy_score,
            self.efficiency_score,
        ]
    }
}

/// How serious a flag is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lenient parse used when normalizing model output; anything
    /// unrecognized maps to Low
    pub fn parse(value: &str) -> Severity {
        match value.trim().to_lowercase().as_str() {
            "high" | "critical" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

/// Something in the call that needs reviewer attention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFlag {
    /// Short categorical label, e.g. "compliance", "adverse_event"
    #[serde(rename = "type")]
    pub flag_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Provenance of a finished analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Model that produced it, or "local-fallback"
    pub model: String,
    /// Schema/pipeline version
    pub version: String,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// The analysis facets the normalizer produces; id, call id, and metadata
/// are attached by the caller when the record is assembled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDraft {
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub clinical_summary: ClinicalSummary,
    #[serde(default)]
    pub agent_performance: AgentPerformance,
    #[serde(default)]
    pub call_summary: String,
    #[serde(default)]
    pub disposition: String,
    #[serde(default)]
    pub follow_up_required: bool,
    #[serde(default)]
    pub flags: Vec<CallFlag>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AnalysisDraft {
    /// True when any numeric score is non-zero. All-zero is the explicit
    /// "no quantitative scoring available" signal, not a missing field.
    pub fn has_quantitative_scores(&self) -> bool {
        self.sentiment.overall_score != 0 || self.agent_performance.scores().iter().any(|&s| s != 0)
    }

    /// Every numeric score in the draft, for invariant checks
    pub fn all_scores(&self) -> Vec<i64> {
        let mut scores = vec![self.sentiment.overall_score];
        scores.extend(self.sentiment.timeline.iter().map(|p| p.score));
        scores.extend(self.agent_performance.scores());
        scores
    }
}

/// A stored call analysis: one live instance per call; re-analysis replaces
/// the prior record and its derived rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Unique identifier (UUID)
    pub id: String,
    /// Call this analysis belongs to
    pub call_id: String,
    pub sentiment: Sentiment,
    pub clinical_summary: ClinicalSummary,
    pub agent_performance: AgentPerformance,
    pub call_summary: String,
    pub disposition: String,
    pub follow_up_required: bool,
    pub flags: Vec<CallFlag>,
    pub tags: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl Analysis {
    /// Assemble a persistable record from normalizer output
    pub fn from_draft(call_id: impl Into<String>, draft: AnalysisDraft, metadata: AnalysisMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            sentiment: draft.sentiment,
            clinical_summary: draft.clinical_summary,
            agent_performance: draft.agent_performance,
            call_summary: draft.call_summary,
            disposition: draft.disposition,
            follow_up_required: draft.follow_up_required,
            flags: draft.flags,
            tags: draft.tags,
            metadata,
        }
    }
}
