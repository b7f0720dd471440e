use anyhow::Result;
use rusqlite::Row;

use super::OptionalExt;
use crate::models::CommentRow;
use crate::{Database, now_timestamp};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.user_id, u.username, u.profile_picture, c.content,
           c.parent_id, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id";

impl Database {
    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, content, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                (id, post_id, user_id, content, parent_id, &now),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            stmt.query_row([id], map_comment).optional()
        })
    }

    /// Every comment on a post, flat, oldest first. Threading is rebuilt by
    /// the caller from `parent_id`.
    pub fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at, c.rowid"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment_content(&self, id: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                (id, content, now_timestamp()),
            )?;
            Ok(changed == 1)
        })
    }

    /// Replies are removed with their parent (ON DELETE CASCADE).
    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }

    pub fn count_comments(&self, post_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        profile_picture: row.get(4)?,
        content: row.get(5)?,
        parent_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
