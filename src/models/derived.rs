use serde::{Deserialize, Serialize};

use super::analysis::{Analysis, CallFlag, DrugMention, Severity};

/// A drug mention expanded out of an `Analysis` into its own row, so the
/// review dashboard can query mentions across calls
///
/// Owned by the analysis: replaced wholesale whenever the call is
/// re-analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugMentionRecord {
    /// Unique identifier (UUID)
    pub id: String,
    /// Parent call
    pub call_id: String,
    /// Analysis this row was projected from
    pub analysis_id: String,
    pub name: String,
    pub count: i64,
    pub context: String,
}

impl DrugMentionRecord {
    pub fn from_mention(analysis: &Analysis, mention: &DrugMention) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: analysis.call_id.clone(),
            analysis_id: analysis.id.clone(),
            name: mention.name.clone(),
            count: mention.count,
            context: mention.context.clone(),
        }
    }
}

/// A call flag expanded out of an `Analysis` into its own row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFlagRecord {
    /// Unique identifier (UUID)
    pub id: String,
    /// Parent call
    pub call_id: String,
    /// Analysis this row was projected from
    pub analysis_id: String,
    pub flag_type: String,
    pub description: String,
    pub severity: Severity,
}

impl CallFlagRecord {
    pub fn from_flag(analysis: &Analysis, flag: &CallFlag) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: analysis.call_id.clone(),
            analysis_id: analysis.id.clone(),
            flag_type: flag.flag_type.clone(),
            description: flag.description.clone(),
            severity: flag.severity,
        }
    }
}
