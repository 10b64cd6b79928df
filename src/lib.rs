pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod stages;
pub mod storage;

pub use heuristics::{enrich_drug_mentions, extract_drug_mentions, fallback_analysis};
pub use io::{parse_transcript_input, read_transcript_file, AnalysisReport, HumanReport};
pub use llm::{ChatClient, CompletionClient, ModelConfig};
pub use models::{
    Analysis, AnalysisDraft, CallFlagRecord, DrugMentionRecord, ProviderTranscript, Speaker,
    Transcription,
};
pub use pipeline::{AnalysisPipeline, PipelineConfig, ANALYSIS_VERSION};
pub use stages::{
    analyze_transcription, mask_transcription, project_derived_records, segment_transcript,
    MaskingConfig, NormalizerConfig, SegmenterConfig,
};
pub use storage::{CallStore, MemoryStore, StoreError};
