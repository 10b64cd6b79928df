use crate::models::{Transcription, TranscriptionSegment};

/// System prompt for the analysis model (non-negotiable constraints)
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a clinical call-quality analyst reviewing customer-service calls for a pharmacy support line. You MUST follow these rules:

1. Output exactly ONE JSON object matching the shape below. No prose before or after it.
2. Every numeric score MUST be an integer from 0 to 100.
3. Use only information present in the transcript. Never invent drug names, conditions, or events.
4. Bracketed tags like [PATIENT_NAME] or [PHONE_NUMBER] are privacy redactions. Treat them as opaque placeholders, never as clinical content.
5. When the transcript gives no basis for a field, return its empty or zero value. Do not omit keys.

SCORING RUBRIC (applies to every 0-100 score, so values are comparable call-to-call):
- 90-100: exceptional
- 75-89: strong
- 55-74: adequate
- 40-54: weak
- 0-39: significant concern

OUTPUT SHAPE:
{
  "sentiment": {
    "overallScore": 0,
    "timeline": [{"time": 0, "score": 0}],
    "emotionTags": ["string"],
    "escalationPoints": [{"time": 0, "text": "string", "reason": "string"}]
  },
  "clinicalSummary": {
    "medicalConditions": ["string"],
    "drugMentions": [{"name": "string", "count": 1, "context": "string"}],
    "clinicalContext": "string"
  },
  "agentPerformance": {
    "communicationScore": 0,
    "adherenceToProtocol": 0,
    "empathyScore": 0,
    "efficiencyScore": 0,
    "improvementAreas": ["string"],
    "effectiveTechniques": ["string"]
  },
  "callSummary": "string",
  "disposition": "string",
  "followUpRequired": false,
  "flags": [{"type": "string", "description": "string", "severity": "low|medium|high"}],
  "tags": ["string"]
}

Timeline and escalation "time" values are seconds into the call; use "unknown" for an escalation you cannot place on the timeline."#;

/// Join segments into the speaker-labeled form used in prompts, one
/// `Speaker: text` line per segment separated by a blank line
pub fn join_speaker_labeled(segments: &[TranscriptionSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.speaker.label(), s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the user prompt for call analysis
pub fn build_analysis_prompt(transcription: &Transcription) -> String {
    let segments = transcription.analysis_segments();
    let mut prompt = String::new();

    // Call metadata
    prompt.push_str("# Call\n");
    prompt.push_str(&format!("Call ID: {}\n", transcription.call_id));
    prompt.push_str(&format!("Language: {}\n", transcription.language));
    prompt.push_str(&format!(
        "Duration: {:.1}s across {} segments\n\n",
        transcription.duration_secs(),
        segments.len()
    ));

    // Full speaker-labeled transcript
    prompt.push_str("# Transcript\n\n");
    prompt.push_str(&join_speaker_labeled(segments));
    prompt.push_str("\n\n");

    prompt.push_str("# Task\n");
    prompt.push_str("Analyze the call above and return the single JSON object described in the system prompt. ");
    prompt.push_str("Score sentiment and agent performance against the rubric, list every drug mentioned with its occurrence count and surrounding context, ");
    prompt.push_str("and flag anything a reviewer should look at.\n");

    prompt
}
