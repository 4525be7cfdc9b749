use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UpdateProfileRequest,
            UserResponse,
        },
        extractors::AuthUser,
        services,
    },
    error::AppError,
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_me).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (token, user) = services::login(&state, payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, email = %auth.email))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::resolve_identity(&state, auth.id).await?;
    Ok(Json(UserResponse { user }))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id, email = %auth.email))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::update_profile(&state, auth.id, payload).await?;
    Ok(Json(UserResponse { user }))
}
