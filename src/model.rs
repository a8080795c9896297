// client/src/model.rs
// In-memory projections of the rows the backend owns.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Auth identities ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// The identity the auth service knows about, as opposed to the `users` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

/// Row written on every observed sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUpsert {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: String,
    pub updated_at: DateTime<Utc>,
}

impl UserUpsert {
    pub fn from_identity(user: &AuthUser, fallback_avatar_base: &str, now: DateTime<Utc>) -> Self {
        let meta = &user.user_metadata;
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: meta.first_name.clone().filter(|s| !s.is_empty()),
            last_name: meta.last_name.clone().filter(|s| !s.is_empty()),
            profile_image_url: meta
                .avatar_url
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("{}{}", fallback_avatar_base, user.id)),
            updated_at: now,
        }
    }
}

// --- Rows ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last" when both are present, otherwise the email.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => format!("{} {}", first, last),
            _ => self.email.clone().unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn avatar_url(&self, fallback_base: &str) -> String {
        self.profile_image_url
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}{}", fallback_base, self.id))
    }
}

impl From<&AuthUser> for User {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.user_metadata.first_name.clone(),
            last_name: user.user_metadata.last_name.clone(),
            profile_image_url: user.user_metadata.avatar_url.clone(),
            bio: None,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeRef {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRef {
    pub count: u64,
}

/// A `posts` row with its embedded author, likes and comment count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub likes: Option<Vec<LikeRef>>,
    #[serde(default)]
    pub comments: Option<Vec<CountRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user: Option<User>,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes_count: u64,
    pub is_liked: bool,
    pub comments_count: u64,
}

impl Post {
    /// Derives the like count, the viewer's like flag and the comment count.
    pub fn from_row(row: PostRow, viewer: Option<Uuid>) -> Self {
        let likes = row.likes.unwrap_or_default();
        let is_liked = viewer.map(|v| likes.iter().any(|l| l.user_id == v)).unwrap_or(false);
        let comments_count = row
            .comments
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| c.count)
            .unwrap_or(0);
        Self {
            id: row.id,
            user_id: row.user_id,
            user: row.user,
            image_url: row.image_url,
            caption: row.caption.filter(|c| !c.is_empty()),
            created_at: row.created_at,
            likes_count: likes.len() as u64,
            is_liked,
            comments_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub image_url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default, alias = "image_url")]
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
}

/// A `users` row merged with its aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: Uuid::nil(),
            email: Some("ana@example.com".into()),
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
            profile_image_url: None,
            bio: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn display_name_needs_both_names() {
        assert_eq!(user(Some("Ana"), Some("Lima")).display_name(), "Ana Lima");
        assert_eq!(user(Some("Ana"), None).display_name(), "ana@example.com");
        assert_eq!(user(None, None).display_name(), "ana@example.com");
    }

    #[test]
    fn post_row_normalization() {
        let viewer = Uuid::new_v4();
        let row: PostRow = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "image_url": "https://cdn.example/p.png",
            "caption": "",
            "created_at": "2024-05-01T10:00:00Z",
            "likes": [{"user_id": viewer}, {"user_id": Uuid::new_v4()}],
            "comments": [{"count": 4}]
        }))
        .unwrap();
        let post = Post::from_row(row, Some(viewer));
        assert_eq!(post.likes_count, 2);
        assert!(post.is_liked);
        assert_eq!(post.comments_count, 4);
        assert_eq!(post.caption, None);
    }

    #[test]
    fn post_row_without_embeds_defaults_to_zero() {
        let row: PostRow = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "image_url": "u",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        let post = Post::from_row(row, None);
        assert_eq!((post.likes_count, post.is_liked, post.comments_count), (0, false, 0));
    }

    #[test]
    fn upsert_uses_fallback_avatar_seeded_by_id() {
        let id = Uuid::new_v4();
        let identity = AuthUser { id, email: Some("a@b.c".into()), user_metadata: UserMetadata::default() };
        let row = UserUpsert::from_identity(&identity, "https://avatars.example/?seed=", Utc::now());
        assert_eq!(row.profile_image_url, format!("https://avatars.example/?seed={}", id));
        assert_eq!(row.first_name, None);
    }

    #[test]
    fn upsert_prefers_metadata_avatar() {
        let identity = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            user_metadata: UserMetadata {
                first_name: Some("Bo".into()),
                last_name: Some("Ng".into()),
                avatar_url: Some("https://me.example/a.png".into()),
            },
        };
        let row = UserUpsert::from_identity(&identity, "unused", Utc::now());
        assert_eq!(row.profile_image_url, "https://me.example/a.png");
        assert_eq!(row.first_name.as_deref(), Some("Bo"));
    }

    #[test]
    fn profile_flattens_user_columns() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "email": "x@y.z",
            "posts_count": 1,
            "followers_count": 2,
            "following_count": 3,
            "is_following": false
        }))
        .unwrap();
        assert_eq!(profile.user.email.as_deref(), Some("x@y.z"));
        assert_eq!(profile.following_count, 3);
    }
}
