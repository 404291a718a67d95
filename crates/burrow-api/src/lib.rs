pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod votes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use burrow_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// The full forum router with the session middleware applied. Every request
/// passes through identity resolution before reaching a handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/createpost", post(posts::create_post))
        .route("/deletepost", post(posts::delete_post))
        .route("/deletecomment", post(comments::delete_comment))
        .route("/posts", get(posts::list_posts))
        .route("/post/{id}", get(posts::show_post).post(comments::add_comment))
        .route("/categories", get(posts::list_categories))
        .route("/like", post(votes::post_vote))
        .route("/comment-like", post(votes::comment_vote))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::with_session,
        ))
        .with_state(state)
}
