use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreatePostRequest, PostResponse};
use crate::{
    error::{AppError, Result},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/post", post(create_post))
        .route("/post/:name", get(find_post))
}

#[instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>> {
    body.validate()?;
    let post = state.posts.insert(body.into()).await?;
    info!(post_id = %post.id, "post created");
    Ok(Json(post.into()))
}

#[instrument(skip(state))]
pub async fn find_post(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PostResponse>> {
    state
        .posts
        .find_first_by_name(&name)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| AppError::NotFound(format!("No post found for '{name}'")))
}
