use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::io::AnalysisReport;
use crate::llm::CompletionClient;
use crate::models::{Analysis, AnalysisMetadata, ProviderTranscript};
use crate::stages::{
    analyze_transcription, mask_transcription, project_derived_records, segment_transcript,
    MaskingConfig, NormalizerConfig, SegmenterConfig,
};
use crate::storage::CallStore;

/// Version stamped into `AnalysisMetadata` for every committed analysis
pub const ANALYSIS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub segmenter: SegmenterConfig,
    pub masking: MaskingConfig,
    pub normalizer: NormalizerConfig,
    /// Analyze the raw transcript without producing a masked view
    pub skip_masking: bool,
}

/// Per-call orchestration: segment, mask, analyze, project, commit.
///
/// `run` produces exactly one persisted analysis per call. The commit is
/// the final step, so a run that fails earlier leaves the prior analysis
/// and its derived rows untouched.
pub struct AnalysisPipeline<'a> {
    masking_client: &'a dyn CompletionClient,
    analysis_client: &'a dyn CompletionClient,
    store: &'a dyn CallStore,
    config: PipelineConfig,
}

impl<'a> AnalysisPipeline<'a> {
    pub fn new(
        masking_client: &'a dyn CompletionClient,
        analysis_client: &'a dyn CompletionClient,
        store: &'a dyn CallStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            masking_client,
            analysis_client,
            store,
            config,
        }
    }

    /// Segment a provider transcript, persist it, and analyze it
    pub async fn process_transcript(
        &self,
        call_id: &str,
        provider: &ProviderTranscript,
        fallback_language: &str,
    ) -> Result<AnalysisReport> {
        let segmented =
            segment_transcript(call_id, provider, fallback_language, &self.config.segmenter);
        self.store.put_transcription(segmented.transcription)?;
        self.run(call_id).await
    }

    /// Analyze the transcription stored for a call.
    ///
    /// 1. Mask PII (unless skipped), persisting the masked view
    /// 2. Analyze the privacy-safe view, falling back locally on failure
    /// 3. Assemble the analysis record with provenance metadata
    /// 4. Project derived rows and commit everything in one replace
    pub async fn run(&self, call_id: &str) -> Result<AnalysisReport> {
        let started = Instant::now();
        let mut transcription = self.store.transcription(call_id)?;

        if self.config.skip_masking {
            info!("Masking skipped for call {}", call_id);
        } else {
            mask_transcription(self.masking_client, &mut transcription, &self.config.masking)
                .await;
            self.store.put_transcription(transcription.clone())?;
        }

        let normalized =
            analyze_transcription(self.analysis_client, &transcription, &self.config.normalizer)
                .await;

        let metadata = AnalysisMetadata {
            model: normalized.model,
            version: ANALYSIS_VERSION.to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        let analysis = Analysis::from_draft(call_id, normalized.draft, metadata);

        let projection = project_derived_records(&analysis);
        self.store.replace_analysis(
            analysis.clone(),
            projection.drug_mentions.clone(),
            projection.flags.clone(),
        )?;

        info!(
            "Committed analysis {} for call {} in {} ms",
            analysis.id, call_id, analysis.metadata.processing_time_ms
        );

        Ok(AnalysisReport {
            transcription,
            analysis,
            drug_mentions: projection.drug_mentions,
            flags: projection.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use anyhow::anyhow;
    use serde_json::json;

    use super::*;
    use crate::models::FALLBACK_MODEL;
    use crate::storage::MemoryStore;

    struct ScriptedClient {
        reply: String,
    }

    impl CompletionClient for ScriptedClient {
        fn complete<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            let reply = self.reply.clone();
            Box::pin(async move { Ok(reply) })
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }
    }

    struct FailingClient;

    impl CompletionClient for FailingClient {
        fn complete<'a>(
            &'a self,
            _system: &'a str,
            _user: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }
    }

    fn provider() -> ProviderTranscript {
        ProviderTranscript {
            text: "Thank you for calling, am I speaking with John Smith? Yes, I need a refill of Ozempic."
                .to_string(),
            segments: vec![],
            language: Some("en-US".to_string()),
        }
    }

    fn analysis_reply(mentions: &[&str]) -> String {
        let mentions: Vec<_> = mentions
            .iter()
            .map(|name| json!({"name": name, "count": 1, "context": "refill"}))
            .collect();
        json!({
            "sentiment": {"overallScore": 70},
            "clinicalSummary": {"drugMentions": mentions},
            "callSummary": "Refill call.",
            "disposition": "Resolved",
            "flags": [{"type": "escalation", "severity": "low"}]
        })
        .to_string()
    }

    fn skip_masking_config() -> PipelineConfig {
        PipelineConfig {
            skip_masking: true,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_process_commits_analysis_and_derived_rows() {
        let store = MemoryStore::new();
        let analysis_client = ScriptedClient {
            reply: analysis_reply(&["Ozempic", "Metformin"]),
        };
        let pipeline = AnalysisPipeline::new(
            &FailingClient,
            &analysis_client,
            &store,
            skip_masking_config(),
        );

        let report = pipeline
            .process_transcript("call-1", &provider(), "en")
            .await
            .unwrap();

        assert_eq!(report.analysis.call_id, "call-1");
        assert_eq!(report.analysis.metadata.model, "scripted-model");
        assert_eq!(report.analysis.metadata.version, ANALYSIS_VERSION);
        assert_eq!(report.drug_mentions.len(), 2);
        assert_eq!(report.flags.len(), 1);

        let stored = store.analysis("call-1").unwrap();
        assert_eq!(stored.id, report.analysis.id);
        assert_eq!(store.drug_mentions("call-1").len(), 2);
        assert_eq!(store.flags("call-1").len(), 1);
        assert_eq!(store.transcription("call-1").unwrap().language, "en-US");
    }

    #[tokio::test]
    async fn test_rerun_replaces_analysis_and_rows() {
        let store = MemoryStore::new();

        let first_client = ScriptedClient {
            reply: analysis_reply(&["Ozempic", "Metformin"]),
        };
        let first = AnalysisPipeline::new(&FailingClient, &first_client, &store, skip_masking_config());
        first
            .process_transcript("call-1", &provider(), "en")
            .await
            .unwrap();

        let second_client = ScriptedClient {
            reply: analysis_reply(&["Lisinopril"]),
        };
        let second =
            AnalysisPipeline::new(&FailingClient, &second_client, &store, skip_masking_config());
        let report = second.run("call-1").await.unwrap();

        let mentions = store.drug_mentions("call-1");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].name, "Lisinopril");
        assert!(mentions.iter().all(|m| m.analysis_id == report.analysis.id));
    }

    #[tokio::test]
    async fn test_upstream_failure_commits_fallback_analysis() {
        let store = MemoryStore::new();
        let pipeline =
            AnalysisPipeline::new(&FailingClient, &FailingClient, &store, skip_masking_config());

        let report = pipeline
            .process_transcript("call-2", &provider(), "en")
            .await
            .unwrap();

        assert_eq!(report.analysis.metadata.model, FALLBACK_MODEL);
        assert!(report
            .drug_mentions
            .iter()
            .any(|m| m.name == "Ozempic"));
        assert_eq!(store.analysis("call-2").unwrap().metadata.model, FALLBACK_MODEL);
    }

    #[tokio::test]
    async fn test_masking_failure_still_commits_with_error_marker() {
        let store = MemoryStore::new();
        let analysis_client = ScriptedClient {
            reply: analysis_reply(&[]),
        };
        let pipeline = AnalysisPipeline::new(
            &FailingClient,
            &analysis_client,
            &store,
            PipelineConfig::default(),
        );

        pipeline
            .process_transcript("call-3", &provider(), "en")
            .await
            .unwrap();

        let stored = store.transcription("call-3").unwrap();
        let masking = stored.masking.expect("masking metadata attached");
        assert_eq!(masking.model, "none - error occurred");
        assert!(store.analysis("call-3").is_ok());
    }

    #[tokio::test]
    async fn test_run_without_stored_transcription_is_an_error() {
        let store = MemoryStore::new();
        let pipeline =
            AnalysisPipeline::new(&FailingClient, &FailingClient, &store, skip_masking_config());

        assert!(pipeline.run("missing-call").await.is_err());
        assert!(store.analysis("missing-call").is_err());
    }
}
