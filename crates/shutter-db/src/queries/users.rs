use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, now_timestamp};

const USER_COLUMNS: &str =
    "id, username, email, password, profile_picture, bio, created_at, updated_at";

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                (id, username, email, password_hash, &now),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Overwrites bio and picture path. Returns false when no such user.
    pub fn update_profile(
        &self,
        id: &str,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET bio = ?2, profile_picture = ?3, updated_at = ?4 WHERE id = ?1",
                (id, bio, profile_picture, now_timestamp()),
            )?;
            Ok(changed == 1)
        })
    }

    /// `(followers, following)` for a user.
    pub fn follow_counts(&self, user_id: &str) -> Result<(u64, u64)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
                [user_id],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
            )?;
            Ok(counts)
        })
    }
}

pub(super) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        profile_picture: row.get(4)?,
        bio: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of our own literals, never client input
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}
