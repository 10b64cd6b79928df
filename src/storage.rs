use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::models::{Analysis, CallFlagRecord, DrugMentionRecord, Transcription};

/// Errors surfaced by call stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no transcription stored for call {call_id}")]
    TranscriptionNotFound { call_id: String },
    #[error("no analysis stored for call {call_id}")]
    AnalysisNotFound { call_id: String },
}

/// Persistence seam for the pipeline. One live transcription and one live
/// analysis per call; storing again replaces the prior record.
pub trait CallStore: Send + Sync {
    fn put_transcription(&self, transcription: Transcription) -> Result<(), StoreError>;

    fn transcription(&self, call_id: &str) -> Result<Transcription, StoreError>;

    /// Store an analysis together with its derived rows, replacing the
    /// prior analysis and every derived row that belonged to it in one
    /// step. Partial replacement is never observable.
    fn replace_analysis(
        &self,
        analysis: Analysis,
        drug_mentions: Vec<DrugMentionRecord>,
        flags: Vec<CallFlagRecord>,
    ) -> Result<(), StoreError>;

    fn analysis(&self, call_id: &str) -> Result<Analysis, StoreError>;

    fn drug_mentions(&self, call_id: &str) -> Vec<DrugMentionRecord>;

    fn flags(&self, call_id: &str) -> Vec<CallFlagRecord>;
}

#[derive(Debug, Default)]
struct StoreInner {
    transcriptions: HashMap<String, Transcription>,
    analyses: HashMap<String, Analysis>,
    drug_mentions: HashMap<String, Vec<DrugMentionRecord>>,
    flags: HashMap<String, Vec<CallFlagRecord>>,
}

/// In-memory store keyed by call id. All maps share one lock, so
/// `replace_analysis` swaps the analysis and its derived rows atomically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CallStore for MemoryStore {
    fn put_transcription(&self, transcription: Transcription) -> Result<(), StoreError> {
        self.locked()
            .transcriptions
            .insert(transcription.call_id.clone(), transcription);
        Ok(())
    }

    fn transcription(&self, call_id: &str) -> Result<Transcription, StoreError> {
        self.locked()
            .transcriptions
            .get(call_id)
            .cloned()
            .ok_or_else(|| StoreError::TranscriptionNotFound {
                call_id: call_id.to_string(),
            })
    }

    fn replace_analysis(
        &self,
        analysis: Analysis,
        drug_mentions: Vec<DrugMentionRecord>,
        flags: Vec<CallFlagRecord>,
    ) -> Result<(), StoreError> {
        let mut inner = self.locked();
        let call_id = analysis.call_id.clone();
        inner.analyses.insert(call_id.clone(), analysis);
        inner.drug_mentions.insert(call_id.clone(), drug_mentions);
        inner.flags.insert(call_id, flags);
        Ok(())
    }

    fn analysis(&self, call_id: &str) -> Result<Analysis, StoreError> {
        self.locked()
            .analyses
            .get(call_id)
            .cloned()
            .ok_or_else(|| StoreError::AnalysisNotFound {
                call_id: call_id.to_string(),
            })
    }

    fn drug_mentions(&self, call_id: &str) -> Vec<DrugMentionRecord> {
        self.locked()
            .drug_mentions
            .get(call_id)
            .cloned()
            .unwrap_or_default()
    }

    fn flags(&self, call_id: &str) -> Vec<CallFlagRecord> {
        self.locked().flags.get(call_id).cloned().unwrap_or_default()
    }
}
