use anyhow::Result;
use rusqlite::Connection;

use crate::models::UserSummaryRow;
use crate::{Database, now_timestamp};

impl Database {
    /// Inserts the edge follower -> followee. Returns false when it already
    /// existed; the UNIQUE constraint keeps concurrent duplicates to one row.
    pub fn create_follow(&self, id: &str, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (id, follower_id, followee_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, follower_id, followee_id, now_timestamp()),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                (follower_id, followee_id),
            )?;
            Ok(deleted == 1)
        })
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2)",
                (follower_id, followee_id),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// True only when both a -> b and b -> a exist.
    pub fn is_mutual(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let edges: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows
                 WHERE (follower_id = ?1 AND followee_id = ?2)
                    OR (follower_id = ?2 AND followee_id = ?1)",
                (a, b),
                |row| row.get(0),
            )?;
            Ok(edges == 2)
        })
    }

    /// Users following `user_id`, oldest edge first.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_follow_users(
                conn,
                "SELECT u.id, u.username, u.profile_picture
                 FROM follows f JOIN users u ON u.id = f.follower_id
                 WHERE f.followee_id = ?1
                 ORDER BY f.created_at, f.rowid",
                user_id,
            )
        })
    }

    /// Users `user_id` follows, oldest edge first.
    pub fn get_following(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_follow_users(
                conn,
                "SELECT u.id, u.username, u.profile_picture
                 FROM follows f JOIN users u ON u.id = f.followee_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at, f.rowid",
                user_id,
            )
        })
    }
}

fn query_follow_users(conn: &Connection, sql: &str, user_id: &str) -> Result<Vec<UserSummaryRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(UserSummaryRow {
                id: row.get(0)?,
                username: row.get(1)?,
                profile_picture: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
