use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CategorySummary, UserSummary};

// Request fields default to empty so a missing field reaches handler
// validation (400). Unknown fields are ignored.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AccountUser,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: AccountUser,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
    pub created_at: DateTime<Utc>,
}

// -- Follows --

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub message: String,
    pub following: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowStatusResponse {
    pub is_following: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutualResponse {
    pub is_mutual: bool,
    pub is_following: bool,
    pub is_followed_by: bool,
}

// -- Posts --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    pub caption: String,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    pub category: Option<CategorySummary>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    /// Likes inside the trending window; only set on trending results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_likes: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostPageResponse {
    pub posts: Vec<PostResponse>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post: PostResponse,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePostRequest {
    pub caption: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub search_term: String,
    pub posts: Vec<PostResponse>,
    pub total_results: u64,
    pub has_more: bool,
    pub page: u32,
}

// -- Likes --

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
}

// -- Comments --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// A comment with its replies nested to any depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
    pub replies: Vec<CommentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentCountResponse {
    pub count: u64,
}

// -- Collections --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub collection_id: Uuid,
    pub user_id: Uuid,
    pub collection_name: String,
    pub created_at: DateTime<Utc>,
    pub posts_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionDetailResponse {
    #[serde(flatten)]
    pub collection: CollectionResponse,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCollectionRequest {
    pub collection_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCollectionResponse {
    pub message: String,
    pub collection: CollectionResponse,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddPostToCollectionRequest {
    pub post_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkStatusResponse {
    pub is_bookmarked: bool,
    pub collection_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_request_fields_fall_back_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(req.username, "alice");
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }

    #[test]
    fn unknown_request_fields_are_ignored() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","email":"a@b.c","password":"pw","confirmPassword":"pw"}"#,
        )
        .unwrap();
        assert_eq!(req.password, "pw");
    }

    #[test]
    fn wrong_field_types_still_fail() {
        let res = serde_json::from_str::<CreateCollectionRequest>(r#"{"collection_name":5}"#);
        assert!(res.is_err());
    }

    #[test]
    fn page_uses_frontend_field_names() {
        let page = PostPageResponse {
            posts: vec![],
            page: 0,
            limit: 10,
            total: 0,
            has_more: false,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasMore"], false);

        let search = SearchResponse {
            search_term: "cat".into(),
            posts: vec![],
            total_results: 0,
            has_more: false,
            page: 0,
        };
        let json = serde_json::to_value(&search).unwrap();
        assert_eq!(json["searchTerm"], "cat");
        assert_eq!(json["totalResults"], 0);
    }
}
