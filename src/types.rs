use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::lesson_tools::types::WeeklyPlanRecord;

/// A saved weekly plan. Timestamps are RFC 3339.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyDraft {
    pub id: String,
    pub record: WeeklyPlanRecord,
    pub created_at: String,
    pub updated_at: String,
}

/// Short listing entry for a draft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DraftSummary {
    pub id: String,
    pub teacher: String,
    pub teaching_date: String,
    pub updated_at: String,
}

impl From<&WeeklyDraft> for DraftSummary {
    fn from(draft: &WeeklyDraft) -> Self {
        Self {
            id: draft.id.clone(),
            teacher: draft.record.teacher.clone(),
            teaching_date: draft.record.teaching_date.clone(),
            updated_at: draft.updated_at.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StorageData {
    #[serde(default)]
    pub drafts: HashMap<String, WeeklyDraft>,
}
