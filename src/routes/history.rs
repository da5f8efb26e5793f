use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query},
    response::IntoResponse,
};
use tracing::info;

use crate::dto::history_dto::{ArchiveQuery, HistoryEntry, HistoryList, HistoryListQuery};
use crate::error::AppError;
use crate::routes::Ack;
use crate::services::{
    archive::archive_current,
    draft_control::DraftController,
    history::{DEFAULT_LIST_LIMIT, HistoryStore, MAX_LIST_LIMIT},
};

pub type SharedHistory = Arc<dyn HistoryStore>;

/// Copies the live draft to the previous-draft slot and the history store,
/// resetting it afterwards when `?reset=true` and both copies succeeded.
pub async fn archive_draft(
    Extension(controller): Extension<Arc<DraftController>>,
    Extension(history): Extension<SharedHistory>,
    Query(query): Query<ArchiveQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = archive_current(&controller, history.as_ref(), query.reset).await?;
    Ok((report.status(), Json(report)))
}

pub async fn list_drafts(
    Extension(history): Extension<SharedHistory>,
    Query(query): Query<HistoryListQuery>,
) -> Result<Json<HistoryList>, AppError> {
    let limit = query
        .limit
        .filter(|&limit| limit > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);

    let drafts = history.list(limit).await?;
    info!("Listed {} archived draft(s).", drafts.len());
    Ok(Json(HistoryList {
        success: true,
        count: drafts.len(),
        drafts,
    }))
}

pub async fn get_draft(
    Extension(history): Extension<SharedHistory>,
    Path(id): Path<String>,
) -> Result<Json<HistoryEntry>, AppError> {
    let draft = history
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))?;

    Ok(Json(HistoryEntry {
        success: true,
        draft,
    }))
}

pub async fn delete_draft(
    Extension(history): Extension<SharedHistory>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !history.delete(&id).await? {
        return Err(AppError::NotFound(format!("Draft {id} not found")));
    }
    info!("Deleted archived draft {}.", id);
    Ok(Ack::new(format!("Draft {id} deleted")))
}
