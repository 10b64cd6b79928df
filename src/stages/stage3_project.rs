use tracing::info;

use crate::models::{Analysis, CallFlagRecord, DrugMentionRecord};

/// Result of the projection stage
#[derive(Debug)]
pub struct ProjectionResult {
    pub drug_mentions: Vec<DrugMentionRecord>,
    pub flags: Vec<CallFlagRecord>,
}

/// Expand the collections embedded in an analysis into standalone rows the
/// review dashboard can query across calls.
///
/// Every row carries the parent call id and analysis id, and rows preserve
/// the order of the collections they came from. The caller persists them
/// together with the analysis so re-analysis replaces both in one step.
pub fn project_derived_records(analysis: &Analysis) -> ProjectionResult {
    let drug_mentions = analysis
        .clinical_summary
        .drug_mentions
        .iter()
        .map(|mention| DrugMentionRecord::from_mention(analysis, mention))
        .collect::<Vec<_>>();

    let flags = analysis
        .flags
        .iter()
        .map(|flag| CallFlagRecord::from_flag(analysis, flag))
        .collect::<Vec<_>>();

    info!(
        "Projected {} drug mention row(s) and {} flag row(s) for call {}",
        drug_mentions.len(),
        flags.len(),
        analysis.call_id
    );

    ProjectionResult {
        drug_mentions,
        flags,
    }
}
