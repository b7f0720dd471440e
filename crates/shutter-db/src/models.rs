//! Database row types. These map directly to SQLite rows and are kept apart
//! from the shutter-types API shapes so the storage layer stays independent.

use std::collections::{HashMap, HashSet};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Owner projection joined onto posts, comments and follow lists.
pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub profile_picture: Option<String>,
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// A post joined with its owner and category.
#[derive(Debug)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub image_url: String,
    pub caption: String,
    pub category_id: String,
    pub category_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One page of posts plus the size of the whole result set.
pub struct PostPage {
    pub rows: Vec<PostRow>,
    pub total: u64,
}

pub struct TrendingRow {
    pub post: PostRow,
    pub recent_likes: u64,
}

/// A comment joined with its author.
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct CollectionRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
    pub posts_count: u64,
}

/// Per-viewer facts about a batch of posts, each filled by its own query.
#[derive(Debug, Default)]
pub struct PostAggregates {
    pub liked: HashSet<String>,
    pub like_counts: HashMap<String, u64>,
    pub comment_counts: HashMap<String, u64>,
    pub bookmarked: HashSet<String>,
}
