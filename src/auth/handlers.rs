use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{SignInRequest, TokenResponse},
        extractors::SessionToken,
        jwt::JwtKeys,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signin", post(sign_in))
        .route("/users/refresh_token", get(refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let issued = services::sign_in(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(issued.into()))
}

#[instrument(skip(state, token))]
pub async fn refresh_token(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<TokenResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let issued = services::refresh(&keys, &token)?;
    Ok(Json(issued.into()))
}
