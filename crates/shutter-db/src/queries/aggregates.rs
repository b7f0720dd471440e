//! Batched per-post lookups used to decorate feed pages. Each one is a single
//! query over the given ids and is independent of the others.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use rusqlite::{Connection, params_from_iter};

use super::placeholders;
use crate::Database;
use crate::models::PostAggregates;

impl Database {
    /// Runs all four lookups for a viewer over one page of posts.
    pub fn post_aggregates(&self, viewer_id: &str, post_ids: &[String]) -> Result<PostAggregates> {
        if post_ids.is_empty() {
            return Ok(PostAggregates::default());
        }

        Ok(PostAggregates {
            liked: self.liked_post_ids(viewer_id, post_ids)?,
            like_counts: self.like_counts(post_ids)?,
            comment_counts: self.comment_counts(post_ids)?,
            bookmarked: self.bookmarked_post_ids(viewer_id, post_ids)?,
        })
    }

    /// Subset of `post_ids` the viewer has liked.
    pub fn liked_post_ids(&self, viewer_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.with_conn(|conn| {
            query_id_set(
                conn,
                &format!(
                    "SELECT post_id FROM likes WHERE user_id = ?1 AND post_id IN ({})",
                    placeholders(2, post_ids.len())
                ),
                viewer_id,
                post_ids,
            )
        })
    }

    /// Total likes per post. Posts without likes are absent from the map.
    pub fn like_counts(&self, post_ids: &[String]) -> Result<HashMap<String, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            query_counts(
                conn,
                &format!(
                    "SELECT post_id, COUNT(*) FROM likes WHERE post_id IN ({}) GROUP BY post_id",
                    placeholders(1, post_ids.len())
                ),
                post_ids,
            )
        })
    }

    /// Total comments (replies included) per post.
    pub fn comment_counts(&self, post_ids: &[String]) -> Result<HashMap<String, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            query_counts(
                conn,
                &format!(
                    "SELECT post_id, COUNT(*) FROM comments WHERE post_id IN ({}) GROUP BY post_id",
                    placeholders(1, post_ids.len())
                ),
                post_ids,
            )
        })
    }

    /// Subset of `post_ids` sitting in any of the viewer's collections.
    pub fn bookmarked_post_ids(&self, viewer_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.with_conn(|conn| {
            query_id_set(
                conn,
                &format!(
                    "SELECT DISTINCT cp.post_id
                     FROM collection_posts cp
                     JOIN collections c ON c.id = cp.collection_id
                     WHERE c.user_id = ?1 AND cp.post_id IN ({})",
                    placeholders(2, post_ids.len())
                ),
                viewer_id,
                post_ids,
            )
        })
    }
}

fn query_id_set(
    conn: &Connection,
    sql: &str,
    viewer_id: &str,
    post_ids: &[String],
) -> Result<HashSet<String>> {
    let params = std::iter::once(viewer_id).chain(post_ids.iter().map(String::as_str));
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params_from_iter(params), |row| row.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;
    Ok(ids)
}

fn query_counts(conn: &Connection, sql: &str, post_ids: &[String]) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare(sql)?;
    let counts = stmt
        .query_map(params_from_iter(post_ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(counts)
}
