//! Pass-through documents: stored whole as posted, then announced.

use axum::extract::{Extension, Json, rejection::JsonRejection};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::dto::{match_dto::MatchData, update_dto::Signal};
use crate::error::AppError;
use crate::routes::{Ack, payload};
use crate::services::{
    store::{DocumentStore, Domain},
    websocket::Broadcaster,
};

async fn read(store: &DocumentStore, domain: Domain) -> Result<Json<Value>, AppError> {
    Ok(Json(store.get(domain).await?))
}

pub async fn get_matchdata(
    Extension(store): Extension<DocumentStore>,
) -> Result<Json<MatchData>, AppError> {
    Ok(Json(store.get_or_default(Domain::MatchData).await?))
}

pub async fn post_matchdata(
    Extension(store): Extension<DocumentStore>,
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<MatchData>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let roster = payload(body)?
        .normalized()
        .map_err(AppError::Validation)?;

    store.set_as(Domain::MatchData, &roster).await?;
    info!(
        "Roster saved: {} vs {}.",
        roster.teamdata.blueteam.teamname, roster.teamdata.redteam.teamname
    );
    broadcaster.publish(&Signal::MatchdataUpdate);
    Ok(Ack::new("Match data saved"))
}

pub async fn get_mapdraw(Extension(store): Extension<DocumentStore>) -> Result<Json<Value>, AppError> {
    read(&store, Domain::MapDraw).await
}

pub async fn post_mapdraw(
    Extension(store): Extension<DocumentStore>,
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let document = payload(body)?;
    store.set(Domain::MapDraw, &document).await?;

    let data = document.get("drawdata").cloned().unwrap_or(Value::Null);
    broadcaster.publish(&Signal::MapdrawUpdate { data });
    Ok(Ack::new("Map draw saved"))
}

pub async fn get_postgame(Extension(store): Extension<DocumentStore>) -> Result<Json<Value>, AppError> {
    read(&store, Domain::Postgame).await
}

/// Postgame stats are pulled by their page on demand; nothing is announced.
pub async fn post_postgame(
    Extension(store): Extension<DocumentStore>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    store.set(Domain::Postgame, &payload(body)?).await?;
    Ok(Ack::new("Postgame data saved"))
}

pub async fn get_mvp(Extension(store): Extension<DocumentStore>) -> Result<Json<Value>, AppError> {
    read(&store, Domain::Mvp).await
}

pub async fn post_mvp(
    Extension(store): Extension<DocumentStore>,
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let document = payload(body)?;
    store.set(Domain::Mvp, &document).await?;

    let data = document.get("mvp").cloned().unwrap_or(Value::Null);
    broadcaster.publish(&Signal::MvpUpdate { data });
    Ok(Ack::new("MVP saved successfully"))
}

pub async fn get_schedule(Extension(store): Extension<DocumentStore>) -> Result<Json<Value>, AppError> {
    read(&store, Domain::Schedule).await
}

pub async fn post_schedule(
    Extension(store): Extension<DocumentStore>,
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let document = payload(body)?;
    store.set(Domain::Schedule, &document).await?;
    broadcaster.publish(&Signal::ScheduleUpdate { data: document });
    Ok(Ack::new("Schedule saved"))
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    #[serde(rename = "videoId", default)]
    pub video_id: Value,
}

pub async fn get_notification(
    Extension(store): Extension<DocumentStore>,
) -> Result<Json<Value>, AppError> {
    read(&store, Domain::Notification).await
}

pub async fn post_notification(
    Extension(store): Extension<DocumentStore>,
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let request = payload(body)?;
    let document = json!({
        "currentVideo": request.video_id,
        "timestamp": Utc::now().timestamp_millis(),
    });
    store.set(Domain::Notification, &document).await?;

    info!("Notification triggered: {}", request.video_id);
    broadcaster.publish(&Signal::NotificationTrigger {
        video_id: request.video_id,
    });
    Ok(Ack::new("Notification triggered"))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzerCommand {
    pub action: String,
}

/// Remote control for the analyzer page; nothing is stored.
pub async fn analyzer_control(
    Extension(broadcaster): Extension<Broadcaster>,
    body: Result<Json<AnalyzerCommand>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let command = payload(body)?;
    let message = format!("Analyzer command {} sent", command.action);
    broadcaster.publish(&Signal::AnalyzerControl {
        action: command.action,
    });
    Ok(Ack::new(message))
}
