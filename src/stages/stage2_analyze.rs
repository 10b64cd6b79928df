use serde_json::Value;
use tracing::{info, warn};

use crate::heuristics::{enrich_drug_mentions, fallback_analysis};
use crate::llm::{
    build_analysis_prompt, extract_json_object, CompletionClient, ANALYSIS_SYSTEM_PROMPT,
};
use crate::models::{
    AgentPerformance, AnalysisDraft, CallFlag, ClinicalSummary, DrugMention, EscalationPoint,
    EscalationTime, Sentiment, SentimentPoint, Severity, Transcription, FALLBACK_MODEL,
    PARSING_ERROR_TAG,
};

/// Configuration for the analysis stage
#[derive(Debug, Clone, Default)]
pub struct NormalizerConfig {
    /// Skip the model call and analyze with the local keyword scan only
    pub offline: bool,
}

/// How the model interaction resolved
#[derive(Debug)]
pub enum ModelOutcome {
    /// A JSON object was recovered from the reply
    Parsed { value: Value, raw: String },
    /// No usable reply; the deterministic fallback takes over
    Fallback {
        reason: FallbackReason,
        raw: Option<String>,
    },
}

/// Why the fallback ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The request failed before any reply arrived
    RequestFailed,
    /// The model replied but no JSON object could be recovered
    MalformedReply,
    /// Model calls are disabled
    Disabled,
}

/// Result of the analysis stage: a draft plus provenance. The caller
/// attaches the call id and metadata when assembling the stored record.
#[derive(Debug)]
pub struct NormalizedAnalysis {
    pub draft: AnalysisDraft,
    /// Model recorded in metadata: the client's model, or "local-fallback"
    pub model: String,
    /// Raw model reply kept for audit, when one arrived
    pub raw_reply: Option<String>,
    pub used_fallback: bool,
}

/// Execute analysis: prompt the model, parse its reply, and normalize the
/// result into the canonical draft shape.
///
/// 1. Build the analysis prompt from the privacy-safe transcript view
/// 2. Recover a JSON object from the reply, tolerating code fences and
///    surrounding prose
/// 3. Normalize field aliases, coerce scalar types, and default every
///    absent field so no consumer ever sees a missing value
/// 4. On request failure or an unparseable reply, rebuild the draft with
///    the local keyword scan instead
///
/// The contract is total: every transcription yields a complete draft.
/// Failures downgrade through `ModelOutcome` rather than propagating.
pub async fn analyze_transcription(
    client: &dyn CompletionClient,
    transcription: &Transcription,
    config: &NormalizerConfig,
) -> NormalizedAnalysis {
    let outcome = if config.offline {
        ModelOutcome::Fallback {
            reason: FallbackReason::Disabled,
            raw: None,
        }
    } else {
        prompt_and_parse(client, transcription).await
    };

    let (mut draft, model, raw_reply, used_fallback) = match outcome {
        ModelOutcome::Parsed { value, raw } => {
            let draft = normalize_response(&value);
            (draft, client.model_name().to_string(), Some(raw), false)
        }
        ModelOutcome::Fallback { reason, raw } => {
            let mut draft = fallback_analysis(transcription.analysis_text());
            if reason == FallbackReason::MalformedReply {
                draft.tags.push(PARSING_ERROR_TAG.to_string());
            }
            (draft, FALLBACK_MODEL.to_string(), raw, true)
        }
    };

    let added = enrich_drug_mentions(&mut draft.clinical_summary);
    if added > 0 {
        info!("Keyword extractor recovered {} drug mention(s) from clinical context", added);
    }

    info!(
        "Analyzed call {} with {}: disposition '{}', {} flag(s), {} drug mention(s)",
        transcription.call_id,
        model,
        draft.disposition,
        draft.flags.len(),
        draft.clinical_summary.drug_mentions.len()
    );

    NormalizedAnalysis {
        draft,
        model,
        raw_reply,
        used_fallback,
    }
}

/// Call the model and recover a JSON object from whatever it sends back
async fn prompt_and_parse(
    client: &dyn CompletionClient,
    transcription: &Transcription,
) -> ModelOutcome {
    let prompt = build_analysis_prompt(transcription);

    let reply = match client.complete(ANALYSIS_SYSTEM_PROMPT, &prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Analysis request failed, using local fallback: {}", e);
            return ModelOutcome::Fallback {
                reason: FallbackReason::RequestFailed,
                raw: None,
            };
        }
    };

    match extract_json_object(&reply) {
        Some(value) => ModelOutcome::Parsed { value, raw: reply },
        None => {
            warn!("Analysis reply contained no recoverable JSON object, using local fallback");
            ModelOutcome::Fallback {
                reason: FallbackReason::MalformedReply,
                raw: Some(reply),
            }
        }
    }
}

/// Field names the models actually emit. Resolution tries the canonical
/// name first, then the alias, and treats explicit null as absent.
mod keys {
    pub const SENTIMENT: (&str, &str) = ("sentiment", "sentimentAnalysis");
    pub const CLINICAL: (&str, &str) = ("clinicalSummary", "clinical");
    pub const PERFORMANCE: (&str, &str) = ("agentPerformance", "performance");
    pub const CALL_SUMMARY: (&str, &str) = ("callSummary", "summary");
    pub const DISPOSITION: (&str, &str) = ("disposition", "callDisposition");
    pub const FOLLOW_UP: (&str, &str) = ("followUpRequired", "followUp");
    pub const FLAGS: (&str, &str) = ("flags", "callFlags");
    pub const TAGS: (&str, &str) = ("tags", "keyTopics");

    pub const OVERALL_SCORE: (&str, &str) = ("overallScore", "score");
    pub const TIMELINE: (&str, &str) = ("timeline", "sentimentTimeline");
    pub const EMOTION_TAGS: (&str, &str) = ("emotionTags", "emotions");
    pub const ESCALATIONS: (&str, &str) = ("escalationPoints", "escalations");

    pub const CONDITIONS: (&str, &str) = ("medicalConditions", "conditions");
    pub const DRUG_MENTIONS: (&str, &str) = ("drugMentions", "medications");
    pub const CONTEXT: (&str, &str) = ("clinicalContext", "context");

    pub const COMMUNICATION: (&str, &str) = ("communicationScore", "communication");
    pub const ADHERENCE: (&str, &str) = ("adherenceToProtocol", "protocolAdherence");
    pub const EMPATHY: (&str, &str) = ("empathyScore", "empathy");
    pub const EFFICIENCY: (&str, &str) = ("efficiencyScore", "efficiency");
    pub const IMPROVEMENT: (&str, &str) = ("improvementAreas", "areasForImprovement");
    pub const TECHNIQUES: (&str, &str) = ("effectiveTechniques", "techniques");

    pub const FLAG_TYPE: (&str, &str) = ("type", "flagType");
}

fn resolve<'v>(value: &'v Value, keys: (&str, &str)) -> Option<&'v Value> {
    value
        .get(keys.0)
        .or_else(|| value.get(keys.1))
        .filter(|v| !v.is_null())
}

fn array_items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

/// Map a parsed reply onto the canonical draft shape. Absent facets become
/// their defaults; re-normalizing an already canonical draft is a no-op.
pub fn normalize_response(value: &Value) -> AnalysisDraft {
    AnalysisDraft {
        sentiment: normalize_sentiment(resolve(value, keys::SENTIMENT)),
        clinical_summary: normalize_clinical(resolve(value, keys::CLINICAL)),
        agent_performance: normalize_performance(resolve(value, keys::PERFORMANCE)),
        call_summary: string_value(resolve(value, keys::CALL_SUMMARY)),
        disposition: string_value(resolve(value, keys::DISPOSITION)),
        follow_up_required: bool_value(resolve(value, keys::FOLLOW_UP)),
        flags: array_items(resolve(value, keys::FLAGS))
            .filter_map(flag_value)
            .collect(),
        tags: string_list(resolve(value, keys::TAGS)),
    }
}

fn normalize_sentiment(value: Option<&Value>) -> Sentiment {
    let Some(v) = value else {
        return Sentiment::default();
    };

    Sentiment {
        overall_score: score_value(resolve(v, keys::OVERALL_SCORE)),
        timeline: array_items(resolve(v, keys::TIMELINE))
            .map(|point| SentimentPoint {
                time: float_value(point.get("time")),
                score: score_value(point.get("score")),
            })
            .collect(),
        emotion_tags: string_list(resolve(v, keys::EMOTION_TAGS)),
        escalation_points: array_items(resolve(v, keys::ESCALATIONS))
            .map(|point| EscalationPoint {
                time: escalation_time(point.get("time")),
                text: string_value(point.get("text")),
                reason: string_value(point.get("reason")),
            })
            .collect(),
    }
}

fn normalize_clinical(value: Option<&Value>) -> ClinicalSummary {
    let Some(v) = value else {
        return ClinicalSummary::default();
    };

    ClinicalSummary {
        medical_conditions: string_list(resolve(v, keys::CONDITIONS)),
        drug_mentions: array_items(resolve(v, keys::DRUG_MENTIONS))
            .filter_map(drug_mention_value)
            .collect(),
        clinical_context: string_value(resolve(v, keys::CONTEXT)),
    }
}

fn normalize_performance(value: Option<&Value>) -> AgentPerformance {
    let Some(v) = value else {
        return AgentPerformance::default();
    };

    AgentPerformance {
        communication_score: score_value(resolve(v, keys::COMMUNICATION)),
        adherence_to_protocol: score_value(resolve(v, keys::ADHERENCE)),
        empathy_score: score_value(resolve(v, keys::EMPATHY)),
        efficiency_score: score_value(resolve(v, keys::EFFICIENCY)),
        improvement_areas: string_list(resolve(v, keys::IMPROVEMENT)),
        effective_techniques: string_list(resolve(v, keys::TECHNIQUES)),
    }
}

/// A structured mention object, or a bare drug-name string
fn drug_mention_value(item: &Value) -> Option<DrugMention> {
    if let Some(name) = item.as_str() {
        let name = name.trim();
        return (!name.is_empty()).then(|| DrugMention::new(name, 1, ""));
    }

    let name = string_value(item.get("name"));
    if name.is_empty() {
        return None;
    }
    Some(DrugMention::new(
        name,
        count_value(item.get("count")),
        string_value(item.get("context")),
    ))
}

/// A structured flag object, or a bare label string
fn flag_value(item: &Value) -> Option<CallFlag> {
    if let Some(label) = item.as_str() {
        let label = label.trim();
        return (!label.is_empty()).then(|| CallFlag {
            flag_type: label.to_string(),
            description: String::new(),
            severity: Severity::Low,
        });
    }

    let flag_type = string_value(resolve(item, keys::FLAG_TYPE));
    if flag_type.is_empty() {
        return None;
    }
    Some(CallFlag {
        flag_type,
        description: string_value(item.get("description")),
        severity: Severity::parse(&string_value(item.get("severity"))),
    })
}

/// A 0-100 integer score from a number or numeric string; anything else is 0
fn score_value(value: Option<&Value>) -> i64 {
    integer_value(value).unwrap_or(0).clamp(0, 100)
}

/// An occurrence count, floored at 1 like `DrugMention::new`
fn count_value(value: Option<&Value>) -> i64 {
    integer_value(value).unwrap_or(1).max(1)
}

fn integer_value(value: Option<&Value>) -> Option<i64> {
    let v = value?;
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    if let Some(f) = v.as_f64() {
        return Some(f.round() as i64);
    }
    v.as_str()?.trim().parse::<f64>().ok().map(|f| f.round() as i64)
}

fn float_value(value: Option<&Value>) -> f64 {
    match value {
        Some(v) => v
            .as_f64()
            .or_else(|| v.as_str()?.trim().parse().ok())
            .unwrap_or(0.0),
        None => 0.0,
    }
}

fn string_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn bool_value(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    array_items(value)
        .filter_map(|item| match item {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Seconds when the value is numeric or a numeric string; any other string
/// is kept verbatim as an unanchored marker
fn escalation_time(value: Option<&Value>) -> EscalationTime {
    let Some(v) = value else {
        return EscalationTime::unknown();
    };
    if let Some(seconds) = v.as_f64() {
        return EscalationTime::Seconds(seconds);
    }
    match v.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => s
            .parse::<f64>()
            .map(EscalationTime::Seconds)
            .unwrap_or_else(|_| EscalationTime::Unknown(s.to_string())),
        _ => EscalationTime::unknown(),
    }
}
