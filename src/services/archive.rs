use std::collections::BTreeMap;

use axum::http::StatusCode;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::dto::{
    draft_dto::{DraftDocument, DraftSide},
    history_dto::{ArchiveReport, ArchivedDraft, HistoryRecord, StepResult},
    match_dto::{MatchData, Team, TeamData},
    update_dto::Signal,
};
use crate::error::AppError;
use crate::services::{draft_control::DraftController, history::HistoryStore, store::Domain};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// `/Assets/HeroPick/phoveus.png` → `phoveus`. Bare ids pass through, dots
/// included; only image extensions are dropped.
pub fn normalize_hero(raw: &str) -> String {
    let file = raw.trim().rsplit(['/', '\\']).next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem.to_string()
        }
        _ => file.to_string(),
    }
}

fn compact_name(team: &Team, fallback: &str) -> String {
    let name: String = team
        .teamname
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '/')
        .collect();
    if name.is_empty() { fallback.to_string() } else { name }
}

fn side_names(teams: &TeamData) -> (String, String) {
    (
        compact_name(&teams.blueteam, "BlueTeam"),
        compact_name(&teams.redteam, "RedTeam"),
    )
}

/// `Draft<N>_<Blue>VS<Red>`, where N is the game about to be recorded: one
/// past the higher series score.
pub fn history_id(teams: &TeamData) -> String {
    let (blue, red) = side_names(teams);
    let game = teams
        .blueteam
        .score_value()
        .max(teams.redteam.score_value())
        .saturating_add(1);
    format!("Draft{game}_{blue}VS{red}")
}

fn normalized_side(side: &DraftSide) -> DraftSide {
    let mut side = side.clone();
    for slot in side.ban.iter_mut().chain(side.pick.iter_mut()) {
        slot.hero = normalize_hero(&slot.hero);
    }
    side
}

pub fn build_record(draft: &DraftDocument, teams: &TeamData, saved: DateTime<Utc>) -> HistoryRecord {
    let (mut blue, mut red) = side_names(teams);
    if blue == red {
        blue = "blueside".to_string();
        red = "redside".to_string();
    }

    let mut sides = BTreeMap::new();
    sides.insert(blue, normalized_side(&draft.blueside));
    sides.insert(red, normalized_side(&draft.redside));

    HistoryRecord {
        draftdata: ArchivedDraft {
            timer: draft.timer,
            timer_running: draft.timer_running,
            current_phase: draft.current_phase,
            sides,
        },
        team_data: teams.clone(),
        saved_at: saved.timestamp_millis(),
        saved_date: saved.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Replaces empty objects with `{"name": ""}` and empty arrays with
/// `[{"name": ""}]`, recursively. History backends drop empty composites,
/// which the analyzer page cannot render.
pub fn fill_empty_composites(value: &mut Value) {
    match value {
        Value::Object(map) if map.is_empty() => *value = json!({ "name": "" }),
        Value::Array(items) if items.is_empty() => *value = json!([{ "name": "" }]),
        Value::Object(map) => map.values_mut().for_each(fill_empty_composites),
        Value::Array(items) => items.iter_mut().for_each(fill_empty_composites),
        _ => {}
    }
}

impl ArchiveReport {
    pub fn status(&self) -> StatusCode {
        match (self.local.success, self.history.success) {
            (true, true) => StatusCode::OK,
            (false, false) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::MULTI_STATUS,
        }
    }
}

/// Snapshots the live draft into the previous-draft document and the history
/// store. The two writes are independent; a failure in one is reported and
/// does not undo the other. The draft stays locked until the optional reset,
/// so a selection can never slip in between the snapshot and the reset.
pub async fn archive_current(
    controller: &DraftController,
    history: &dyn HistoryStore,
    reset: bool,
) -> Result<ArchiveReport, AppError> {
    let store = controller.store();
    let section = controller.begin_archive().await;
    let draft = section.snapshot();
    let roster: MatchData = store.get_or_default(Domain::MatchData).await?;
    let draft_id = history_id(&roster.teamdata);

    let local = match store.set_as(Domain::PreviousDraft, &draft).await {
        Ok(()) => StepResult::ok("Draft copied to previous draft."),
        Err(e) => {
            error!("Failed to archive draft locally: {}", e);
            StepResult::failed(e.to_string())
        }
    };

    let record = build_record(&draft.draftdata, &roster.teamdata, Utc::now());
    let history_step = match serde_json::to_value(&record) {
        Ok(mut value) => {
            fill_empty_composites(&mut value);
            match history.save(&draft_id, &value).await {
                Ok(()) => StepResult::ok(format!("Draft saved to history as {draft_id}.")),
                Err(e) => {
                    error!("Failed to save {} to history: {}", draft_id, e);
                    StepResult::failed(e.to_string())
                }
            }
        }
        Err(e) => StepResult::failed(format!("could not encode history record: {e}")),
    };

    let reset = reset && local.success && history_step.success;
    if reset {
        section.reset().await?;
    } else {
        drop(section);
    }
    controller.broadcaster().publish(&Signal::AnalyzerUpdate);

    let message = match (local.success, history_step.success) {
        (true, true) => "Match draft archived locally and to history.",
        (true, false) => "Draft archived locally, but the history save failed.",
        (false, true) => "Draft saved to history, but the local copy failed.",
        (false, false) => "Draft could not be archived.",
    };
    if local.success && history_step.success {
        info!("Archived {}.", draft_id);
    } else {
        warn!("{} ({})", message, draft_id);
    }

    Ok(ArchiveReport {
        message: message.to_string(),
        draft_id,
        local,
        history: history_step,
        reset,
    })
}
