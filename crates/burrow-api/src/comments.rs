use axum::{
    Extension, Form,
    extract::{Path, State},
    response::Redirect,
};
use tracing::debug;
use uuid::Uuid;

use burrow_types::api::{CommentForm, DeleteCommentForm};
use burrow_types::viewer::Viewer;

use crate::AppState;
use crate::error::ApiError;

/// POST /post/{id} — add a comment. Blank text is silently dropped: no row,
/// no error, same redirect back to the post.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::LoginRequired);
    };

    let text = form.comment.trim().to_string();
    if !text.is_empty() {
        let comment_id = Uuid::new_v4();
        let author = identity.user_id.to_string();
        let db = state.clone();
        tokio::task::spawn_blocking(move || {
            db.db
                .insert_comment(&comment_id.to_string(), &post_id.to_string(), &author, &text)
        })
        .await
        .map_err(ApiError::join)?
        .map_err(ApiError::Storage)?;
    }

    Ok(Redirect::to(&format!("/post/{}", post_id)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<DeleteCommentForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::LoginRequired);
    };

    let comment_id: Uuid = form
        .comment_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("invalid comment id".into()))?;

    let owner = identity.user_id.to_string();
    let db = state.clone();
    let deleted =
        tokio::task::spawn_blocking(move || db.db.delete_comment(&comment_id.to_string(), &owner))
            .await
            .map_err(ApiError::join)?
            .map_err(ApiError::Storage)?;

    if !deleted {
        debug!(
            "denied comment delete {} by {}",
            comment_id, identity.username
        );
        return Err(ApiError::Forbidden);
    }

    Ok(Redirect::to("/"))
}
