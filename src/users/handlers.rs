use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{MessageResponse, UpdateNameRequest, UserCountResponse, UserListResponse},
    repo_types::UserPatch,
};
use crate::{
    auth::dto::PublicUser,
    error::{require, AppError, Result},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/count", get(count_users))
        .route("/users/filter/:name", get(search_users))
        .route("/users/:email", axum::routing::put(update_name).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>> {
    let users: Vec<PublicUser> = state
        .users
        .list_all()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(Json(UserListResponse {
        total_users: users.len(),
        users,
    }))
}

#[instrument(skip(state))]
pub async fn count_users(State(state): State<AppState>) -> Result<Json<UserCountResponse>> {
    Ok(Json(UserCountResponse {
        total_users: state.users.count_all().await?,
    }))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UserListResponse>> {
    let users: Vec<PublicUser> = state
        .users
        .search_by_name(&name)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    if users.is_empty() {
        return Err(AppError::NotFound(format!(
            "No users found with name containing '{name}'"
        )));
    }
    Ok(Json(UserListResponse {
        total_users: users.len(),
        users,
    }))
}

#[instrument(skip(state, body))]
pub async fn update_name(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(body): Json<UpdateNameRequest>,
) -> Result<Json<MessageResponse>> {
    require("name", &body.name)?;
    if state.users.find_by_email(&email).await?.is_none() {
        return Err(AppError::UserNotFound);
    }

    let patch = UserPatch {
        name: Some(body.name.clone()),
    };
    if state.users.update_fields(&email, patch).await? == 0 {
        return Ok(Json(MessageResponse::new(
            "Name is already the same, nothing changed",
        )));
    }

    info!(%email, "user name updated");
    Ok(Json(MessageResponse::new(format!(
        "User '{email}' name updated to '{}'",
        body.name
    ))))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>> {
    if state.users.delete_by_email(&email).await? == 0 {
        return Err(AppError::UserNotFound);
    }
    info!(%email, "user deleted");
    Ok(Json(MessageResponse::new(format!(
        "User '{email}' deleted successfully"
    ))))
}
