use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use burrow_db::models::{CommentRow, PostRow};
use burrow_types::api::{
    CategoryView, CommentView, CreatePostForm, DeletePostForm, PostPage, PostView,
};
use burrow_types::viewer::Viewer;

use crate::AppState;
use crate::error::ApiError;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<CreatePostForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::LoginRequired);
    };

    let category_id: Uuid = form
        .category_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("invalid category id".into()))?;

    let post_id = Uuid::new_v4();
    let owner = identity.user_id.to_string();
    let image = form.image.filter(|s| !s.is_empty());

    let db = state.clone();
    tokio::task::spawn_blocking(move || {
        db.db.insert_post(
            &post_id.to_string(),
            &owner,
            &category_id.to_string(),
            &form.title,
            &form.content,
            image.as_deref(),
        )
    })
    .await
    .map_err(ApiError::join)?
    .map_err(ApiError::Storage)?;

    info!("user {} created post {}", identity.username, post_id);
    Ok(Redirect::to("/"))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<DeletePostForm>,
) -> Result<Redirect, ApiError> {
    let Some(identity) = viewer.identity() else {
        return Err(ApiError::LoginRequired);
    };

    let post_id: Uuid = form
        .post_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("invalid post id".into()))?;

    let owner = identity.user_id.to_string();
    let db = state.clone();
    let deleted =
        tokio::task::spawn_blocking(move || db.db.delete_post(&post_id.to_string(), &owner))
            .await
            .map_err(ApiError::join)?
            .map_err(ApiError::Storage)?;

    if !deleted {
        // Absent or owned by someone else; the caller learns neither.
        debug!("denied post delete {} by {}", post_id, identity.username);
        return Err(ApiError::Forbidden);
    }

    Ok(Redirect::to("/"))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let viewer_key = viewer.user_key();
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_posts(viewer_key.as_deref()))
        .await
        .map_err(ApiError::join)?
        .map_err(ApiError::Storage)?;

    Ok(Json(rows.into_iter().map(post_view).collect()))
}

pub async fn show_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<PostPage>, ApiError> {
    let viewer_key = viewer.user_key();
    let db = state.clone();
    let (post, comments) = tokio::task::spawn_blocking(
        move || -> anyhow::Result<(Option<PostRow>, Vec<CommentRow>)> {
            let id = post_id.to_string();
            let post = db.db.get_post(&id, viewer_key.as_deref())?;
            let comments = db.db.get_comments(&id, viewer_key.as_deref())?;
            Ok((post, comments))
        },
    )
    .await
    .map_err(ApiError::join)?
    .map_err(ApiError::Storage)?;

    let Some(post) = post else {
        return Err(ApiError::NotFound);
    };

    Ok(Json(PostPage {
        post: post_view(post),
        comments: comments.into_iter().map(comment_view).collect(),
    }))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryView>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_categories())
        .await
        .map_err(ApiError::join)?
        .map_err(ApiError::Storage)?;

    let categories = rows
        .into_iter()
        .map(|row| CategoryView {
            id: parse_id(&row.id, "category"),
            name: row.name,
        })
        .collect();

    Ok(Json(categories))
}

fn post_view(row: PostRow) -> PostView {
    PostView {
        id: parse_id(&row.id, "post"),
        author_id: parse_id(&row.user_id, "author"),
        author: row.author,
        category_id: parse_id(&row.category_id, "category"),
        category: row.category,
        title: row.title,
        content: row.content,
        image: row.image,
        created_at: parse_timestamp(&row.created_at, &row.id),
        likes: row.likes,
        comments: row.comments,
        viewer_vote: row.viewer_vote,
    }
}

fn comment_view(row: CommentRow) -> CommentView {
    CommentView {
        id: parse_id(&row.id, "comment"),
        post_id: parse_id(&row.post_id, "post"),
        author_id: parse_id(&row.user_id, "author"),
        author: row.author,
        content: row.content,
        created_at: parse_timestamp(&row.created_at, &row.id),
        likes: row.likes,
        viewer_vote: row.viewer_vote,
    }
}

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt created_at '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}
