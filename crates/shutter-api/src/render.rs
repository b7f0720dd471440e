//! Row -> response assembly shared by the handlers.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use shutter_db::models::{
    CategoryRow, CollectionRow, CommentRow, PostAggregates, PostRow, UserSummaryRow,
};
use shutter_types::api::{CollectionResponse, CommentResponse, PostResponse};
use shutter_types::models::{Category, CategorySummary, UserSummary};

pub fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') layout, no timezone; treat as UTC
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

/// Stored upload paths are relative (`/uploads/x.png`); clients get them
/// prefixed with the public base URL. Already-absolute URLs pass through.
pub fn absolute_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

pub fn user_summary(row: UserSummaryRow, base: &str) -> UserSummary {
    UserSummary {
        user_id: parse_uuid(&row.id, "user id"),
        username: row.username,
        profile_picture: row.profile_picture.map(|p| absolute_url(base, &p)),
    }
}

pub fn category(row: CategoryRow) -> Category {
    Category {
        category_id: parse_uuid(&row.id, "category id"),
        category_name: row.name,
        created_at: parse_timestamp(&row.created_at),
    }
}

/// Merges one post row with the viewer's aggregate lookups.
pub fn post_response(row: PostRow, aggregates: &PostAggregates, base: &str) -> PostResponse {
    let category = row.category_name.map(|name| CategorySummary {
        category_id: parse_uuid(&row.category_id, "category id"),
        category_name: name,
    });

    PostResponse {
        post_id: parse_uuid(&row.id, "post id"),
        user_id: parse_uuid(&row.user_id, "user id"),
        image_url: absolute_url(base, &row.image_url),
        caption: row.caption,
        category_id: parse_uuid(&row.category_id, "category id"),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        user: UserSummary {
            user_id: parse_uuid(&row.user_id, "user id"),
            username: row.username,
            profile_picture: row.profile_picture.map(|p| absolute_url(base, &p)),
        },
        category,
        likes_count: aggregates.like_counts.get(&row.id).copied().unwrap_or(0),
        comments_count: aggregates.comment_counts.get(&row.id).copied().unwrap_or(0),
        is_liked: aggregates.liked.contains(&row.id),
        is_bookmarked: aggregates.bookmarked.contains(&row.id),
        recent_likes: None,
    }
}

pub fn post_responses(
    rows: Vec<PostRow>,
    aggregates: &PostAggregates,
    base: &str,
) -> Vec<PostResponse> {
    rows.into_iter()
        .map(|row| post_response(row, aggregates, base))
        .collect()
}

pub fn collection_response(row: CollectionRow) -> CollectionResponse {
    CollectionResponse {
        collection_id: parse_uuid(&row.id, "collection id"),
        user_id: parse_uuid(&row.user_id, "user id"),
        collection_name: row.name,
        created_at: parse_timestamp(&row.created_at),
        posts_count: row.posts_count,
    }
}

pub fn comment_response(row: CommentRow, base: &str) -> CommentResponse {
    CommentResponse {
        comment_id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "post id"),
        user_id: parse_uuid(&row.user_id, "user id"),
        content: row.content,
        parent_id: row.parent_id.as_deref().map(|p| parse_uuid(p, "parent comment id")),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        user: UserSummary {
            user_id: parse_uuid(&row.user_id, "user id"),
            username: row.username,
            profile_picture: row.profile_picture.map(|p| absolute_url(base, &p)),
        },
        replies: Vec::new(),
    }
}

/// Rebuilds the reply tree from a flat, creation-ordered comment list.
///
/// Rows are folded from newest to oldest so every reply is finished before
/// its parent is built; no recursion, so thread depth is unbounded. A
/// comment whose parent is not in the list becomes a root. Siblings keep
/// their position in `rows`.
pub fn comment_tree(rows: Vec<CommentRow>, base: &str) -> Vec<CommentResponse> {
    let ids: HashSet<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut pending: HashMap<String, Vec<(usize, CommentResponse)>> = HashMap::new();
    let mut roots = Vec::new();

    for (pos, row) in rows.into_iter().enumerate().rev() {
        let id = row.id.clone();
        let parent = row.parent_id.clone().filter(|p| ids.contains(p));

        let mut node = comment_response(row, base);
        if let Some(replies) = pending.remove(&id) {
            node.replies = in_list_order(replies);
        }

        match parent {
            Some(parent_id) => pending.entry(parent_id).or_default().push((pos, node)),
            None => roots.push((pos, node)),
        }
    }

    // Replies listed before their parent (clock skew) never got claimed
    for (parent_id, orphans) in pending {
        warn!("{} comment(s) ordered before parent {}", orphans.len(), parent_id);
        roots.extend(orphans);
    }

    in_list_order(roots)
}

fn in_list_order(mut nodes: Vec<(usize, CommentResponse)>) -> Vec<CommentResponse> {
    nodes.sort_by_key(|(pos, _)| *pos);
    nodes.into_iter().map(|(_, node)| node).collect()
}
