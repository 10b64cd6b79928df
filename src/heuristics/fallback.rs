use crate::models::{AgentPerformance, AnalysisDraft, ClinicalSummary, DrugMention, Sentiment};

use super::{count_whole_word, snippet_around, whole_word_spans};

/// Flat score stamped on every fallback analysis. Mid-range on purpose:
/// zero is the "verified absence of scoring" signal, this constant marks
/// an unverified placeholder.
pub const FALLBACK_SCORE: i64 = 50;

/// Disposition recorded when denial language appears in the transcript
pub const DENIAL_DISPOSITION: &str = "Denied - coverage or authorization denied";
/// Disposition recorded when no outcome keyword matched
pub const DEFAULT_DISPOSITION: &str = "Completed - outcome not classified";

/// Known drug names with spelling variants heard in transcripts
const DRUG_VOCABULARY: &[(&str, &[&str])] = &[
    ("Ozempic", &["ozempic", "ozempik", "ozempec"]),
    ("Wegovy", &["wegovy", "wegovee"]),
    ("Humira", &["humira", "humeera"]),
    ("Metformin", &["metformin", "metforman"]),
    ("Lisinopril", &["lisinopril", "lisinapril"]),
    ("Atorvastatin", &["atorvastatin", "lipitor"]),
    ("Insulin", &["insulin"]),
    ("Trulicity", &["trulicity"]),
    ("Jardiance", &["jardiance"]),
    ("Eliquis", &["eliquis"]),
    ("Gabapentin", &["gabapentin"]),
    ("Amoxicillin", &["amoxicillin", "amoxycillin"]),
];

/// Condition names with the keywords that imply them
const CONDITION_VOCABULARY: &[(&str, &[&str])] = &[
    ("Diabetes", &["diabetes", "diabetic"]),
    ("Hypertension", &["hypertension", "high blood pressure"]),
    ("Asthma", &["asthma"]),
    ("COPD", &["copd", "emphysema"]),
    ("Arthritis", &["arthritis", "arthritic"]),
    ("High cholesterol", &["cholesterol"]),
    ("Depression", &["depression"]),
    ("Anxiety", &["anxiety"]),
    ("Migraine", &["migraine", "migraines"]),
    ("Heart disease", &["heart disease", "cardiac"]),
];

/// Deterministic keyword analysis used when no model reply is available.
///
/// Scans the transcript for known drug and condition vocabulary, classifies
/// the disposition from denial language, and stamps flat mid-range scores.
/// Never calls out and never fails.
pub fn fallback_analysis(transcript_text: &str) -> AnalysisDraft {
    let drug_mentions = scan_drug_vocabulary(transcript_text);
    let medical_conditions = scan_condition_vocabulary(transcript_text);

    let denial_detected = count_whole_word(transcript_text, "denied") > 0
        || count_whole_word(transcript_text, "denial") > 0;

    let call_summary = format!(
        "Keyword scan of the transcript found {} drug mention(s) and {} condition keyword(s); model analysis was unavailable.",
        drug_mentions.len(),
        medical_conditions.len()
    );

    AnalysisDraft {
        sentiment: Sentiment {
            overall_score: FALLBACK_SCORE,
            ..Default::default()
        },
        clinical_summary: ClinicalSummary {
            medical_conditions,
            drug_mentions,
            clinical_context: String::new(),
        },
        agent_performance: AgentPerformance {
            communication_score: FALLBACK_SCORE,
            adherence_to_protocol: FALLBACK_SCORE,
            empathy_score: FALLBACK_SCORE,
            efficiency_score: FALLBACK_SCORE,
            ..Default::default()
        },
        call_summary,
        disposition: if denial_detected {
            DENIAL_DISPOSITION.to_string()
        } else {
            DEFAULT_DISPOSITION.to_string()
        },
        follow_up_required: denial_detected,
        flags: Vec::new(),
        tags: Vec::new(),
    }
}

/// Count vocabulary drugs across all their spelling variants
fn scan_drug_vocabulary(text: &str) -> Vec<DrugMention> {
    let mut mentions = Vec::new();

    for (canonical, variants) in DRUG_VOCABULARY {
        let mut spans: Vec<(usize, usize)> = variants
            .iter()
            .flat_map(|v| whole_word_spans(text, v))
            .collect();
        if spans.is_empty() {
            continue;
        }
        spans.sort_unstable();

        let (start, end) = spans[0];
        mentions.push(DrugMention::new(
            *canonical,
            spans.len() as i64,
            snippet_around(text, start, end),
        ));
    }

    mentions
}

fn scan_condition_vocabulary(text: &str) -> Vec<String> {
    CONDITION_VOCABULARY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| count_whole_word(text, k) > 0))
        .map(|(name, _)| name.to_string())
        .collect()
}
