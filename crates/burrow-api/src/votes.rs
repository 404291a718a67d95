use axum::{
    Extension, Form,
    extract::State,
    http::{HeaderMap, header},
    response::Redirect,
};
use uuid::Uuid;

use burrow_types::api::{CommentVoteForm, PostVoteForm};
use burrow_types::viewer::Viewer;

use crate::AppState;
use crate::error::ApiError;

/// POST /like — cast, change, or retract a vote on a post. Voting surfaces
/// a hard 401 for anonymous callers, unlike the mutation endpoints' login
/// redirect.
pub async fn post_vote(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<PostVoteForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::Unauthorized);
    };

    let post_id: Uuid = form
        .post_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("invalid post id".into()))?;
    let value = parse_vote(&form.value)?;

    let voter = identity.user_id.to_string();
    let db = state.clone();
    tokio::task::spawn_blocking(move || {
        let id = post_id.to_string();
        if value == 0 {
            db.db.clear_post_vote(&id, &voter)
        } else {
            db.db.upsert_post_vote(&id, &voter, value)
        }
    })
    .await
    .map_err(ApiError::join)?
    .map_err(ApiError::Storage)?;

    let return_to = form
        .return_to
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&return_to))
}

/// POST /comment-like — same contract as post votes, independent namespace.
/// Redirects back to the referring page.
pub async fn comment_vote(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    headers: HeaderMap,
    Form(form): Form<CommentVoteForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::Unauthorized);
    };

    let comment_id: Uuid = form
        .comment_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("invalid comment id".into()))?;
    let value = parse_vote(&form.value)?;

    let voter = identity.user_id.to_string();
    let db = state.clone();
    tokio::task::spawn_blocking(move || {
        let id = comment_id.to_string();
        if value == 0 {
            db.db.clear_comment_vote(&id, &voter)
        } else {
            db.db.upsert_comment_vote(&id, &voter, value)
        }
    })
    .await
    .map_err(ApiError::join)?
    .map_err(ApiError::Storage)?;

    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/")
        .to_string();
    Ok(Redirect::to(&back))
}

/// Only -1, 0, and +1 are vote values; everything else is rejected before
/// storage is touched.
fn parse_vote(raw: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(v @ (-1 | 0 | 1)) => Ok(v),
        _ => Err(ApiError::Validation("invalid vote value".into())),
    }
}
