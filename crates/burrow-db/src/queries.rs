use crate::Database;
use crate::models::{CategoryRow, CommentRow, PostRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    /// True when the username OR the email is already registered. The caller
    /// reports one generic conflict either way; nothing here says which
    /// field collided.
    pub fn identity_taken(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 OR username = ?2",
                (email, username),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, created_at FROM users WHERE email = ?1",
            )?;
            let row = stmt
                .query_row([email], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, token: &str, user_id: &str, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (token, user_id, expires_at),
            )?;
            Ok(())
        })
    }

    /// Resolve a session token to (user_id, username). Pure read: expired
    /// rows are simply not matched, never deleted here.
    pub fn resolve_session(&self, token: &str, now: &str) -> Result<Option<(String, String)>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT users.id, users.username
                     FROM sessions JOIN users ON users.id = sessions.user_id
                     WHERE sessions.id = ?1 AND sessions.expires_at > ?2",
                    (token, now),
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Idempotent: deleting an absent token is not an error.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [token])?;
            Ok(())
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        user_id: &str,
        category_id: &str,
        title: &str,
        content: &str,
        image: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, category_id, title, content, image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, category_id, title, content, image],
            )?;
            Ok(())
        })
    }

    /// Conditional delete: only the row matching both the post id and the
    /// owner goes away. Returns false for zero rows affected — absent and
    /// not-owned are indistinguishable by design.
    pub fn delete_post(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(n == 1)
        })
    }

    pub fn list_posts(&self, viewer_id: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, viewer_id))
    }

    pub fn get_post(&self, id: &str, viewer_id: Option<&str>) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, p.category_id, p.title, p.content, p.image, p.created_at,
                        u.username, c.name,
                        (SELECT COUNT(*) FROM post_likes WHERE post_id = p.id AND value = 1),
                        (SELECT COUNT(*) FROM comments WHERE post_id = p.id),
                        COALESCE(l.value, 0)
                 FROM posts p
                 JOIN users u ON u.id = p.user_id
                 JOIN categories c ON c.id = p.category_id
                 LEFT JOIN post_likes l ON l.post_id = p.id AND l.user_id = ?2
                 WHERE p.id = ?1",
            )?;
            let row = stmt
                .query_row(rusqlite::params![id, viewer_id], map_post_row)
                .optional()?;
            Ok(row)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, user_id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, content) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, user_id, content),
            )?;
            Ok(())
        })
    }

    /// Same conflation as [`Database::delete_post`].
    pub fn delete_comment(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(n == 1)
        })
    }

    pub fn get_comments(&self, post_id: &str, viewer_id: Option<&str>) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, post_id, viewer_id))
    }

    // -- Votes --

    /// Single atomic upsert keyed on the UNIQUE (post_id, user_id) pair.
    /// Two concurrent casts from the same voter converge to one row with
    /// the last writer's value; there is no check-then-act window.
    pub fn upsert_post_vote(&self, post_id: &str, user_id: &str, value: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post_likes (post_id, user_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET value = excluded.value",
                rusqlite::params![post_id, user_id, value],
            )?;
            Ok(())
        })
    }

    /// Retract: absence of the row is not an error.
    pub fn clear_post_vote(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                (post_id, user_id),
            )?;
            Ok(())
        })
    }

    pub fn upsert_comment_vote(&self, comment_id: &str, user_id: &str, value: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comment_likes (comment_id, user_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(comment_id, user_id) DO UPDATE SET value = excluded.value",
                rusqlite::params![comment_id, user_id, value],
            )?;
            Ok(())
        })
    }

    pub fn clear_comment_vote(&self, comment_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
                (comment_id, user_id),
            )?;
            Ok(())
        })
    }

    /// The "likes" badge counts +1 rows only; -1 rows are stored but never
    /// counted here.
    pub fn count_post_likes(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1 AND value = 1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn count_comment_likes(&self, comment_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1 AND value = 1",
                [comment_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_posts(conn: &Connection, viewer_id: Option<&str>) -> Result<Vec<PostRow>> {
    // JOIN users and categories to fetch names in a single query; the
    // LEFT JOIN against post_likes carries the viewer's own vote (a NULL
    // viewer matches nothing and coalesces to 0).
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.category_id, p.title, p.content, p.image, p.created_at,
                u.username, c.name,
                (SELECT COUNT(*) FROM post_likes WHERE post_id = p.id AND value = 1),
                (SELECT COUNT(*) FROM comments WHERE post_id = p.id),
                COALESCE(l.value, 0)
         FROM posts p
         JOIN users u ON u.id = p.user_id
         JOIN categories c ON c.id = p.category_id
         LEFT JOIN post_likes l ON l.post_id = p.id AND l.user_id = ?1
         ORDER BY p.created_at DESC
         LIMIT 20",
    )?;

    let rows = stmt
        .query_map([viewer_id], map_post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_post_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        image: row.get(5)?,
        created_at: row.get(6)?,
        author: row.get(7)?,
        category: row.get(8)?,
        likes: row.get(9)?,
        comments: row.get(10)?,
        viewer_vote: row.get(11)?,
    })
}

fn query_comments(conn: &Connection, post_id: &str, viewer_id: Option<&str>) -> Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare(
        "SELECT cm.id, cm.post_id, cm.user_id, u.username, cm.content, cm.created_at,
                (SELECT COUNT(*) FROM comment_likes WHERE comment_id = cm.id AND value = 1),
                COALESCE(l.value, 0)
         FROM comments cm
         JOIN users u ON u.id = cm.user_id
         LEFT JOIN comment_likes l ON l.comment_id = cm.id AND l.user_id = ?2
         WHERE cm.post_id = ?1
         ORDER BY cm.created_at DESC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![post_id, viewer_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                author: row.get(3)?,
                content: row.get(4)?,
                created_at: row.get(5)?,
                likes: row.get(6)?,
                viewer_vote: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
