use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dto::draft_dto::DraftSide;
use crate::dto::match_dto::TeamData;

/// Draft snapshot with each side keyed by its team name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ArchivedDraft {
    pub timer: u32,
    pub timer_running: bool,
    pub current_phase: usize,
    #[serde(flatten)]
    pub sides: BTreeMap<String, DraftSide>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HistoryRecord {
    pub draftdata: ArchivedDraft,
    #[serde(rename = "teamData")]
    pub team_data: TeamData,
    #[serde(rename = "savedAt")]
    pub saved_at: i64,
    #[serde(rename = "savedDate")]
    pub saved_date: String,
}

/// A record as it comes back from a history backend, id included.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
}

impl StepResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub message: String,
    #[serde(rename = "draftId")]
    pub draft_id: String,
    pub local: StepResult,
    pub history: StepResult,
    pub reset: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ArchiveQuery {
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryList {
    pub success: bool,
    pub drafts: Vec<StoredRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub success: bool,
    pub draft: StoredRecord,
}
