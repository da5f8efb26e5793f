use std::sync::Arc;

use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    response::IntoResponse,
};
use tracing::info;

use crate::dto::draft_dto::{
    ControlRequest, DraftEnvelope, DraftMutationResult, SelectHero, SwapSlots, ToggleCorrection,
};
use crate::error::AppError;
use crate::routes::{Ack, payload};
use crate::services::{
    draft_control::{DraftController, DraftStatus},
    store::{DocumentStore, Domain},
};

pub async fn get_draft(
    Extension(controller): Extension<Arc<DraftController>>,
) -> Json<DraftEnvelope> {
    Json(controller.snapshot().await)
}

/// Whole-document replace, as posted by the control panel.
pub async fn post_draft(
    Extension(controller): Extension<Arc<DraftController>>,
    body: Result<Json<DraftEnvelope>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let envelope = payload(body)?;
    info!(
        "Replacing draft document at phase {}.",
        envelope.draftdata.current_phase
    );
    controller.replace(envelope.draftdata).await?;
    Ok(Ack::new("Draft data saved"))
}

pub async fn get_previous_draft(
    Extension(store): Extension<DocumentStore>,
) -> Result<Json<DraftEnvelope>, AppError> {
    Ok(Json(store.get_or_default(Domain::PreviousDraft).await?))
}

pub async fn get_status(
    Extension(controller): Extension<Arc<DraftController>>,
) -> Json<DraftStatus> {
    Json(controller.status().await)
}

pub async fn select_hero(
    Extension(controller): Extension<Arc<DraftController>>,
    body: Result<Json<SelectHero>, JsonRejection>,
) -> Result<Json<DraftMutationResult>, AppError> {
    let request = payload(body)?;
    Ok(Json(controller.select(request.slot, &request.hero).await?))
}

pub async fn swap_slots(
    Extension(controller): Extension<Arc<DraftController>>,
    body: Result<Json<SwapSlots>, JsonRejection>,
) -> Result<Json<DraftMutationResult>, AppError> {
    let request = payload(body)?;
    info!("Swapping slots {} and {}.", request.first, request.second);
    Ok(Json(controller.swap(request.first, request.second).await?))
}

pub async fn control(
    Extension(controller): Extension<Arc<DraftController>>,
    body: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<DraftMutationResult>, AppError> {
    let request = payload(body)?;
    Ok(Json(controller.control(request.action).await?))
}

pub async fn toggle_correction(
    Extension(controller): Extension<Arc<DraftController>>,
    body: Result<Json<ToggleCorrection>, JsonRejection>,
) -> Result<Json<DraftMutationResult>, AppError> {
    let request = payload(body)?;
    info!("Correction mode -> {}", request.enabled);
    Ok(Json(controller.set_correction_mode(request.enabled).await?))
}
