use anyhow::Result;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::now_timestamp;

/// Categories inserted the first time the schema is created.
const DEFAULT_CATEGORIES: &[&str] = &["Funny", "Animals", "Sports"];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id               TEXT PRIMARY KEY,
                username         TEXT NOT NULL UNIQUE,
                email            TEXT NOT NULL UNIQUE,
                password         TEXT NOT NULL,
                profile_picture  TEXT,
                bio              TEXT,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );

            CREATE TABLE sessions (
                token       TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE follows (
                id           TEXT PRIMARY KEY,
                follower_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followee_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at   TEXT NOT NULL,
                UNIQUE(follower_id, followee_id),
                CHECK(follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE categories (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE posts (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                image_url    TEXT NOT NULL,
                caption      TEXT NOT NULL,
                category_id  TEXT NOT NULL REFERENCES categories(id),
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created ON posts(created_at);
            CREATE INDEX idx_posts_user ON posts(user_id, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                parent_id   TEXT REFERENCES comments(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, post_id)
            );

            CREATE INDEX idx_likes_post ON likes(post_id, created_at);

            CREATE TABLE collections (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_collections_user ON collections(user_id);

            CREATE TABLE collection_posts (
                id             TEXT PRIMARY KEY,
                collection_id  TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                post_id        TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at     TEXT NOT NULL,
                UNIQUE(collection_id, post_id)
            );

            CREATE INDEX idx_collection_posts_post ON collection_posts(post_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        for name in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT OR IGNORE INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
                (Uuid::new_v4().to_string(), name, now_timestamp()),
            )?;
        }
        info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_twice_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let categories: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(categories, DEFAULT_CATEGORIES.len() as i64);
    }
}
