use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

// -- Mutation forms --

#[derive(Debug, Deserialize)]
pub struct CreatePostForm {
    pub category_id: String,
    pub title: String,
    pub content: String,
    /// Optional reference to an already-stored upload; storage itself is
    /// handled outside this service.
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletePostForm {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentForm {
    pub comment_id: String,
}

// -- Vote forms --

/// Ids and value arrive as strings so malformed input is a 400 from our own
/// validation rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct PostVoteForm {
    pub post_id: String,
    pub value: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentVoteForm {
    pub comment_id: String,
    pub value: String,
}

// -- Read models --

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author: String,
    pub category_id: Uuid,
    pub category: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Count of +1 rows only; dislikes are stored but not counted here.
    pub likes: i64,
    pub comments: i64,
    /// The requesting viewer's own vote: -1, 0, or +1.
    pub viewer_vote: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub viewer_vote: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}
