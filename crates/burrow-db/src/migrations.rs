use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per active login. Expired rows are inert: the lookup
        -- filters them out, nothing purges them.
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            expires_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            category_id TEXT NOT NULL REFERENCES categories(id),
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            image       TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        -- At most one signed vote per (post, voter); no row means neutral.
        -- The UNIQUE pair is what makes the vote upsert race-free.
        CREATE TABLE IF NOT EXISTS post_likes (
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            value       INTEGER NOT NULL CHECK (value IN (-1, 1)),
            UNIQUE(post_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_post_likes_post
            ON post_likes(post_id);

        CREATE TABLE IF NOT EXISTS comment_likes (
            comment_id  TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            value       INTEGER NOT NULL CHECK (value IN (-1, 1)),
            UNIQUE(comment_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_comment_likes_comment
            ON comment_likes(comment_id);

        -- Seed the starter categories
        INSERT OR IGNORE INTO categories (id, name) VALUES
            ('00000000-0000-0000-0000-000000000001', 'General'),
            ('00000000-0000-0000-0000-000000000002', 'Books'),
            ('00000000-0000-0000-0000-000000000003', 'Reviews');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
