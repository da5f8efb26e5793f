pub mod config;
pub mod draft;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Extension, Request,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower::ServiceExt;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

use crate::routes::{documents, draft as draft_routes, history};
use crate::services::{
    draft_control::DraftController, history::HistoryStore, websocket::Broadcaster,
};

/// Logos travel inline as data urls inside the roster.
const BODY_LIMIT: usize = 50 * 1024 * 1024;

const CONTROL_PAGE: &str = "control.html";

#[derive(Clone)]
struct PublicDir(PathBuf);

pub struct AppContext {
    pub controller: Arc<DraftController>,
    pub history: Arc<dyn HistoryStore>,
    pub public_dir: PathBuf,
}

pub fn build_router(ctx: AppContext) -> Router {
    let store = ctx.controller.store().clone();
    let broadcaster = ctx.controller.broadcaster().clone();

    Router::new()
        .route("/", get(root))
        .route("/ws", get(websocket_handler))
        .route("/api/matchdraft", get(draft_routes::get_draft).post(draft_routes::post_draft))
        .route("/api/previousdraft", get(draft_routes::get_previous_draft))
        .route("/api/draft/status", get(draft_routes::get_status))
        .route("/api/draft/select", post(draft_routes::select_hero))
        .route("/api/draft/swap", post(draft_routes::swap_slots))
        .route("/api/draft/control", post(draft_routes::control))
        .route("/api/draft/correction", post(draft_routes::toggle_correction))
        .route("/api/archive-draft", post(history::archive_draft))
        .route("/api/match-drafts", get(history::list_drafts))
        .route(
            "/api/match-drafts/{id}",
            get(history::get_draft).delete(history::delete_draft),
        )
        .route(
            "/api/matchdata",
            get(documents::get_matchdata).post(documents::post_matchdata),
        )
        .route(
            "/api/mapdraw",
            get(documents::get_mapdraw).post(documents::post_mapdraw),
        )
        .route(
            "/api/postgame",
            get(documents::get_postgame).post(documents::post_postgame),
        )
        .route("/api/mvp", get(documents::get_mvp).post(documents::post_mvp))
        .route(
            "/api/schedule",
            get(documents::get_schedule).post(documents::post_schedule),
        )
        .route(
            "/api/notification",
            get(documents::get_notification).post(documents::post_notification),
        )
        .route("/api/analyzer-control", post(documents::analyzer_control))
        .fallback_service(ServeDir::new(&ctx.public_dir))
        .layer(Extension(ctx.controller))
        .layer(Extension(ctx.history))
        .layer(Extension(store))
        .layer(Extension(broadcaster))
        .layer(Extension(PublicDir(ctx.public_dir)))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(broadcaster): Extension<Broadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| services::websocket::handle_socket(socket, broadcaster))
}

/// Displays connect to `/` for push updates; browsers get the control panel.
async fn root(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Extension(broadcaster): Extension<Broadcaster>,
    Extension(PublicDir(public_dir)): Extension<PublicDir>,
    request: Request,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| services::websocket::handle_socket(socket, broadcaster))
            .into_response(),
        Err(_) => match ServeFile::new(public_dir.join(CONTROL_PAGE)).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
    }
}

#[cfg(test)]
mod tests;
