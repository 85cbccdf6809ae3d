use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        BanQuery, CreatePrivilegedRequest, CreateUserRequest, FindQuery, FriendQuery,
        MessageResponse, PageFilter, Pagination, PublicUser, UpdateUserRequest,
    },
    services,
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).put(update_user).get(list_users))
        .route("/users/admin", post(create_privileged))
        .route("/users/find", get(find_by_login))
        .route("/users/friend_id", post(add_friend))
        .route("/users/del_friend", delete(delete_friend))
        .route("/users/ban", post(ban_user))
        .route("/users/unban", delete(unban_user))
        .route("/users/:user_id", get(get_user).delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;
    let user = services::sign_up(state.store.as_ref(), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_privileged(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<CreatePrivilegedRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;
    let user =
        services::create_with_role(state.store.as_ref(), caller, payload.user, payload.role)
            .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, path))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Path(user_id) = path?;
    let user = services::read(state.store.as_ref(), caller, user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;
    let user = services::update(state.store.as_ref(), caller, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, path))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<&'static str>, AppError> {
    let Path(user_id) = path?;
    services::delete(state.store.as_ref(), caller, user_id).await?;
    Ok(Json("Deleted"))
}

#[instrument(skip(state, query))]
pub async fn find_by_login(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<FindQuery>, QueryRejection>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let Query(q) = query?;
    let users = services::find_by_login(state.store.as_ref(), caller, &q.login).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, query))]
pub async fn add_friend(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<FriendQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(q) = query?;
    services::add_friend(state.store.as_ref(), caller, q.friend_id).await?;
    Ok(Json(MessageResponse {
        message: "friend added",
    }))
}

#[instrument(skip(state, query))]
pub async fn delete_friend(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<FriendQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(q) = query?;
    services::delete_friend(state.store.as_ref(), caller, q.friend_id).await?;
    Ok(Json(MessageResponse {
        message: "friend removed",
    }))
}

#[instrument(skip(state, query))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<PageFilter>, QueryRejection>,
) -> Result<Json<Pagination>, AppError> {
    let Query(filter) = query?;
    let page = services::list(state.store.as_ref(), caller, filter).await?;
    Ok(Json(page))
}

#[instrument(skip(state, query))]
pub async fn ban_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<BanQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(q) = query?;
    services::ban(state.store.as_ref(), caller, q.banned_id).await?;
    Ok(Json(MessageResponse {
        message: "user banned",
    }))
}

#[instrument(skip(state, query))]
pub async fn unban_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<BanQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(q) = query?;
    services::unban(state.store.as_ref(), caller, q.banned_id).await?;
    Ok(Json(MessageResponse {
        message: "user unbanned",
    }))
}
