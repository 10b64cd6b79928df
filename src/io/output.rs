use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{Analysis, CallFlagRecord, DrugMentionRecord, Severity, Transcription};

/// Machine-readable pipeline output: the stored records for one call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub transcription: Transcription,
    pub analysis: Analysis,
    /// Derived rows projected from the analysis
    pub drug_mentions: Vec<DrugMentionRecord>,
    pub flags: Vec<CallFlagRecord>,
}

impl AnalysisReport {
    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Human-readable report format
pub struct HumanReport<'a> {
    report: &'a AnalysisReport,
}

impl<'a> HumanReport<'a> {
    pub fn new(report: &'a AnalysisReport) -> Self {
        Self { report }
    }

    /// Format the report as human-readable text. The transcript section
    /// uses the masked view when one is attached.
    pub fn format(&self) -> String {
        let transcription = &self.report.transcription;
        let analysis = &self.report.analysis;
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Call {} ({}), {}, {} segments",
            transcription.call_id,
            transcription.language,
            format_timestamp(transcription.duration_secs()),
            transcription.segments.len()
        );
        let _ = writeln!(
            output,
            "Model: {} ({} ms)",
            analysis.metadata.model, analysis.metadata.processing_time_ms
        );
        if let Some(masking) = &transcription.masking {
            let _ = writeln!(
                output,
                "PII masking: {} replacement(s) via {}",
                masking.total_replacements(),
                masking.model
            );
        }
        output.push('\n');

        output.push_str("Summary:\n");
        let summary = if analysis.call_summary.is_empty() {
            "(none)"
        } else {
            &analysis.call_summary
        };
        output.push_str(&wrap_text(summary, 80));
        output.push('\n');
        let _ = writeln!(output, "\nDisposition: {}", analysis.disposition);
        let _ = writeln!(
            output,
            "Follow-up required: {}",
            if analysis.follow_up_required { "yes" } else { "no" }
        );

        let _ = writeln!(
            output,
            "\nSentiment: {}/100",
            analysis.sentiment.overall_score
        );
        let perf = &analysis.agent_performance;
        let _ = writeln!(
            output,
            "Agent: communication {}, protocol {}, empathy {}, efficiency {}",
            perf.communication_score,
            perf.adherence_to_protocol,
            perf.empathy_score,
            perf.efficiency_score
        );

        if !analysis.clinical_summary.drug_mentions.is_empty() {
            output.push_str("\nDrug mentions:\n");
            for mention in &analysis.clinical_summary.drug_mentions {
                let _ = writeln!(output, "  - {} (x{})", mention.name, mention.count);
            }
        }

        if !analysis.flags.is_empty() {
            output.push_str("\nFlags:\n");
            for flag in &analysis.flags {
                let _ = writeln!(
                    output,
                    "  - [{}] {}: {}",
                    severity_label(flag.severity),
                    flag.flag_type,
                    flag.description
                );
            }
        }

        if !analysis.tags.is_empty() {
            let _ = writeln!(output, "\nTags: {}", analysis.tags.join(", "));
        }

        output.push_str("\nTranscript:\n");
        for segment in transcription.analysis_segments() {
            let _ = writeln!(
                output,
                "[{}] {}:",
                format_timestamp(segment.start_time),
                segment.speaker.label()
            );
            output.push_str(&wrap_text(&segment.text, 80));
            output.push_str("\n\n");
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
    }
}

/// Format seconds as MM:SS
fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Wrap text at approximately the given width
fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        if line_len + word.len() + 1 > width && line_len > 0 {
            result.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalysisDraft, AnalysisMetadata, ClinicalSummary, DrugMention, Speaker,
        TranscriptionSegment,
    };

    fn sample_report() -> AnalysisReport {
        let segments = vec![
            TranscriptionSegment::new(Speaker::Agent, "Am I speaking with John Smith?", 0.0, 3.0, 0.9),
            TranscriptionSegment::new(Speaker::Customer, "Yes, about my Ozempic refill.", 3.0, 6.0, 0.9),
        ];
        let mut transcription =
            Transcription::new("call-2", "en-US", "Am I speaking with John Smith? Yes, about my Ozempic refill.", segments);
        let masked = vec![
            TranscriptionSegment::new(Speaker::Agent, "Am I speaking with [PATIENT_NAME]?", 0.0, 3.0, 0.9),
            TranscriptionSegment::new(Speaker::Customer, "Yes, about my Ozempic refill.", 3.0, 6.0, 0.9),
        ];
        transcription.masked_segments = Some(masked);
        transcription.masked_full_text =
            Some("Am I speaking with [PATIENT_NAME]? Yes, about my Ozempic refill.".to_string());

        let draft = AnalysisDraft {
            call_summary: "Caller asked about an Ozempic refill.".to_string(),
            disposition: "Resolved - refill processed".to_string(),
            clinical_summary: ClinicalSummary {
                drug_mentions: vec![DrugMention::new("Ozempic", 1, "refill")],
                ..ClinicalSummary::default()
            },
            ..AnalysisDraft::default()
        };
        let metadata = AnalysisMetadata {
            model: "test-model".to_string(),
            version: "1.0".to_string(),
            processing_time_ms: 120,
            created_at: chrono::Utc::now(),
        };
        let analysis = Analysis::from_draft("call-2", draft, metadata);
        let drug_mentions = analysis
            .clinical_summary
            .drug_mentions
            .iter()
            .map(|m| DrugMentionRecord::from_mention(&analysis, m))
            .collect();

        AnalysisReport {
            transcription,
            analysis,
            drug_mentions,
            flags: vec![],
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.4), "01:05");
        assert_eq!(format_timestamp(3661.0), "61:01");
    }

    #[test]
    fn test_wrap_text() {
        let text = "This is a test of the text wrapping function that should wrap at 20 chars";
        let wrapped = wrap_text(text, 20);
        for line in wrapped.lines() {
            assert!(line.len() <= 25); // Allow some slack for long words
        }
    }

    #[test]
    fn test_human_report_uses_masked_transcript() {
        let report = sample_report();
        let text = HumanReport::new(&report).format();

        assert!(text.contains("Resolved - refill processed"));
        assert!(text.contains("Ozempic (x1)"));
        assert!(text.contains("[PATIENT_NAME]"));
        assert!(!text.contains("John Smith"));
    }

    #[test]
    fn test_write_json_report() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        report.write_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["analysis"]["callId"], "call-2");
        assert_eq!(written["drugMentions"][0]["name"], "Ozempic");
        assert!(written["transcription"]["maskedFullText"]
            .as_str()
            .unwrap()
            .contains("[PATIENT_NAME]"));
    }
}
