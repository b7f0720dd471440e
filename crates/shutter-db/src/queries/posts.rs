use anyhow::Result;
use rusqlite::{Connection, Row, types::ToSql};

use super::OptionalExt;
use crate::models::{PostPage, PostRow, TrendingRow};
use crate::{Database, now_timestamp};

const POST_COLUMNS: &str = "p.id, p.user_id, u.username, u.profile_picture, p.image_url, \
     p.caption, p.category_id, c.name, p.created_at, p.updated_at";

// JOIN owner and category so a page of posts is a single query (no N+1)
const POST_FROM: &str = "FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN categories c ON c.id = p.category_id";

impl Database {
    pub fn insert_post(
        &self,
        id: &str,
        user_id: &str,
        image_url: &str,
        caption: &str,
        category_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO posts (id, user_id, image_url, caption, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                (id, user_id, image_url, caption, category_id, &now),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {POST_COLUMNS} {POST_FROM} WHERE p.id = ?1"))?;
            stmt.query_row([id], map_post).optional()
        })
    }

    /// Newest-first feed page.
    pub fn list_posts(&self, limit: u32, offset: u64) -> Result<PostPage> {
        self.with_conn(|conn| query_post_page(conn, "", &[], limit, offset))
    }

    pub fn list_posts_by_user(&self, user_id: &str, limit: u32, offset: u64) -> Result<PostPage> {
        self.with_conn(|conn| {
            query_post_page(conn, "WHERE p.user_id = ?1", &[&user_id], limit, offset)
        })
    }

    /// Case-insensitive substring match on captions. `term` is matched
    /// literally; LIKE wildcards in it are escaped.
    pub fn search_posts(&self, term: &str, limit: u32, offset: u64) -> Result<PostPage> {
        let pattern = format!("%{}%", escape_like(term));
        self.with_conn(|conn| {
            query_post_page(
                conn,
                "WHERE p.caption LIKE ?1 ESCAPE '\\'",
                &[&pattern],
                limit,
                offset,
            )
        })
    }

    /// Posts liked at or after `since`, ranked by how many likes landed in
    /// that window.
    pub fn trending_posts(&self, since: &str, limit: u32) -> Result<Vec<TrendingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS}, COUNT(l.id) AS recent_likes {POST_FROM}
                 JOIN likes l ON l.post_id = p.id AND l.created_at >= ?1
                 GROUP BY p.id
                 ORDER BY recent_likes DESC, p.created_at DESC, p.rowid DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map((since, limit), |row| {
                    Ok(TrendingRow {
                        post: map_post(row)?,
                        recent_likes: row.get::<_, i64>(10)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts bookmarked in a collection, most recently added first.
    pub fn posts_in_collection(&self, collection_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} {POST_FROM}
                 JOIN collection_posts cp ON cp.post_id = p.id
                 WHERE cp.collection_id = ?1
                 ORDER BY cp.created_at DESC, cp.rowid DESC"
            ))?;
            let rows = stmt
                .query_map([collection_id], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: &str, caption: &str, category_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET caption = ?2, category_id = ?3, updated_at = ?4 WHERE id = ?1",
                (id, caption, category_id, now_timestamp()),
            )?;
            Ok(changed == 1)
        })
    }

    /// Likes, comments and bookmarks of the post go with it (ON DELETE CASCADE).
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        profile_picture: row.get(3)?,
        image_url: row.get(4)?,
        caption: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_post_page(
    conn: &Connection,
    filter: &str,
    args: &[&dyn ToSql],
    limit: u32,
    offset: u64,
) -> Result<PostPage> {
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM posts p {filter}"),
        args,
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {POST_COLUMNS} {POST_FROM} {filter} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?{} OFFSET ?{}",
        args.len() + 1,
        args.len() + 2
    );
    let limit = i64::from(limit);
    let offset = offset as i64;
    let mut params: Vec<&dyn ToSql> = args.to_vec();
    params.push(&limit);
    params.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(PostPage {
        rows,
        total: total as u64,
    })
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
