use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    extract::JsonBody,
    karma::{
        dto::{AddKarmaRequest, EntryResponse, KarmaOverview, MessageResponse},
        services,
    },
    state::AppState,
};

pub fn karma_routes() -> Router<AppState> {
    Router::new()
        .route("/karma", post(add_karma).get(get_karma))
        .route("/karma/today", delete(reset_today))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn add_karma(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<JsonBody<AddKarmaRequest>, AppError>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    // an unreadable body carries no usable type
    let kind = match payload {
        Ok(JsonBody(req)) => req.kind,
        Err(e) => {
            debug!(error = %e, "unreadable karma body");
            None
        }
    };
    let entry = services::append(&state, auth.id, kind.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(EntryResponse { entry })))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_karma(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<KarmaOverview>, AppError> {
    let (history, today) = tokio::try_join!(
        services::history(&state, auth.id),
        services::today_summary(&state, auth.id),
    )?;
    Ok(Json(KarmaOverview { history, today }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn reset_today(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::reset_today(&state, auth.id).await?;
    Ok(Json(MessageResponse {
        message: "Today's karma reset",
    }))
}
