/// Database row types — these map directly to SQLite rows.
/// Distinct from the burrow-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: String,
    pub author: String,
    pub category: String,
    pub likes: i64,
    pub comments: i64,
    pub viewer_vote: i64,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub likes: i64,
    pub viewer_vote: i64,
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
}
