//! View-models: everything a render function needs, already formatted.
//!
//! Built from normalized records; the render functions in `components`
//! never look at model types directly.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::model::{AuthUser, Post, Story, User, UserProfile};
use crate::ui::format::{format_number, format_time_ago};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarView {
    pub url: String,
    pub initials: String,
    pub alt: String,
    pub size: AvatarSize,
}

impl AvatarView {
    pub fn new(user: &User, size: AvatarSize, config: &Config) -> Self {
        let alt = user.display_name();
        Self { url: user.avatar_url(&config.avatar_fallback_base), initials: initials(user), alt, size }
    }

    /// Nav avatar for the signed-in identity: metadata avatar or the seeded fallback.
    pub fn for_identity(user: &AuthUser, config: &Config) -> Self {
        let as_user = User::from(user);
        Self::new(&as_user, AvatarSize::Small, config)
    }
}

fn initials(user: &User) -> String {
    let from_names: String = [user.first_name.as_deref(), user.last_name.as_deref()]
        .iter()
        .flatten()
        .filter_map(|n| n.chars().next())
        .collect();
    if from_names.chars().count() == 2 {
        return from_names.to_uppercase();
    }
    user.email
        .as_deref()
        .and_then(|e| e.chars().next())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostCardView {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author: String,
    pub avatar: AvatarView,
    pub time_ago: String,
    pub image_url: String,
    pub is_liked: bool,
    pub likes_label: String,
    pub caption: Option<String>,
    /// "View all N comments", only when there are comments.
    pub comments_label: Option<String>,
}

impl PostCardView {
    pub fn new(post: &Post, config: &Config, now: DateTime<Utc>) -> Self {
        let author = post.user.clone().unwrap_or_else(|| placeholder_user(post.user_id));
        Self {
            post_id: post.id,
            author_id: post.user_id,
            author: author.display_name(),
            avatar: AvatarView::new(&author, AvatarSize::Medium, config),
            time_ago: format_time_ago(post.created_at, now),
            image_url: post.image_url.clone(),
            is_liked: post.is_liked,
            likes_label: format!("{} likes", format_number(post.likes_count)),
            caption: post.caption.clone(),
            comments_label: (post.comments_count > 0)
                .then(|| format!("View all {} comments", format_number(post.comments_count))),
        }
    }
}

/// Stand-in when a post arrives without its embedded author.
fn placeholder_user(id: Uuid) -> User {
    User {
        id,
        email: None,
        first_name: None,
        last_name: None,
        profile_image_url: None,
        bio: None,
        created_at: None,
        updated_at: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionView {
    pub user_id: Uuid,
    pub name: String,
    pub avatar: AvatarView,
    pub followers_label: String,
    pub followed: bool,
}

impl SuggestionView {
    pub fn new(user: &User, followers: u64, followed: bool, config: &Config) -> Self {
        Self {
            user_id: user.id,
            name: user.display_name(),
            avatar: AvatarView::new(user, AvatarSize::Small, config),
            followers_label: format!("{} followers", format_number(followers)),
            followed,
        }
    }

    pub fn button_label(&self) -> &'static str {
        if self.followed { "Following" } else { "Follow" }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultView {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: AvatarView,
}

impl SearchResultView {
    pub fn new(user: &User, config: &Config) -> Self {
        Self {
            user_id: user.id,
            name: user.display_name(),
            email: user.email.clone().unwrap_or_default(),
            avatar: AvatarView::new(user, AvatarSize::Medium, config),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatView {
    pub value: String,
    pub label: &'static str,
}

fn stats(profile: &UserProfile) -> [StatView; 3] {
    [
        StatView { value: format_number(profile.posts_count), label: "Posts" },
        StatView { value: format_number(profile.followers_count), label: "Followers" },
        StatView { value: format_number(profile.following_count), label: "Following" },
    ]
}

/// Sidebar summary of the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCardView {
    pub name: String,
    pub email: String,
    pub avatar: AvatarView,
    pub stats: [StatView; 3],
}

impl UserCardView {
    pub fn new(profile: &UserProfile, identity: &AuthUser, config: &Config) -> Self {
        let mut avatar = AvatarView::for_identity(identity, config);
        avatar.size = AvatarSize::Large;
        Self {
            name: profile.user.display_name(),
            email: profile.user.email.clone().unwrap_or_default(),
            avatar,
            stats: stats(profile),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileHeaderView {
    pub user_id: Uuid,
    pub name: String,
    pub avatar: AvatarView,
    pub stats: [StatView; 3],
    pub bio: Option<String>,
    /// `None` on the viewer's own profile.
    pub follow_button: Option<&'static str>,
    pub empty_posts_message: &'static str,
}

impl ProfileHeaderView {
    pub fn new(profile: &UserProfile, is_own: bool, config: &Config) -> Self {
        Self {
            user_id: profile.user.id,
            name: profile.user.display_name(),
            avatar: AvatarView::new(&profile.user, AvatarSize::Large, config),
            stats: stats(profile),
            bio: profile.user.bio.clone().filter(|b| !b.trim().is_empty()),
            follow_button: (!is_own).then_some(if profile.is_following { "Unfollow" } else { "Follow" }),
            empty_posts_message: if is_own {
                "Share your first post!"
            } else {
                "This user hasn't posted anything yet."
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryView {
    pub story_id: Uuid,
    pub name: String,
    pub avatar: AvatarView,
    pub time_ago: String,
}

impl StoryView {
    pub fn new(story: &Story, config: &Config, now: DateTime<Utc>) -> Self {
        let author = story.user.clone().unwrap_or_else(|| placeholder_user(story.user_id));
        let name = author.first_name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| author.display_name());
        Self {
            story_id: story.id,
            name,
            avatar: AvatarView::new(&author, AvatarSize::Small, config),
            time_ago: format_time_ago(story.created_at, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("kai@example.com".into()),
            first_name: first.map(Into::into),
            last_name: last.map(Into::into),
            profile_image_url: None,
            bio: Some("  ".into()),
            created_at: None,
            updated_at: None,
        }
    }

    fn profile(user: User, is_following: bool) -> UserProfile {
        UserProfile { user, posts_count: 1_500, followers_count: 12, following_count: 0, is_following }
    }

    #[test]
    fn avatar_falls_back_to_seeded_url() {
        let config = Config::default();
        let u = user(Some("Kai"), Some("Moreau"));
        let view = AvatarView::new(&u, AvatarSize::Small, &config);
        assert_eq!(view.url, format!("{}{}", config.avatar_fallback_base, u.id));
        assert_eq!(view.initials, "KM");
        assert_eq!(view.alt, "Kai Moreau");
    }

    #[test]
    fn initials_use_email_without_both_names() {
        let view = AvatarView::new(&user(Some("Kai"), None), AvatarSize::Small, &Config::default());
        assert_eq!(view.initials, "K");
    }

    #[test]
    fn post_card_labels() {
        let config = Config::default();
        let now = Utc::now();
        let author = user(Some("Kai"), Some("Moreau"));
        let post = Post {
            id: Uuid::new_v4(),
            user_id: author.id,
            user: Some(author),
            image_url: "https://cdn.example/p.png".into(),
            caption: Some("hello".into()),
            created_at: now - Duration::minutes(3),
            likes_count: 1_500,
            is_liked: true,
            comments_count: 0,
        };
        let view = PostCardView::new(&post, &config, now);
        assert_eq!(view.likes_label, "1.5K likes");
        assert_eq!(view.time_ago, "3m ago");
        assert_eq!(view.comments_label, None);
        assert_eq!(view.author, "Kai Moreau");

        let with_comments = Post { comments_count: 4, ..post };
        assert_eq!(
            PostCardView::new(&with_comments, &config, now).comments_label.as_deref(),
            Some("View all 4 comments")
        );
    }

    #[test]
    fn own_profile_has_no_follow_button() {
        let config = Config::default();
        let own = ProfileHeaderView::new(&profile(user(None, None), false), true, &config);
        assert_eq!(own.follow_button, None);
        assert_eq!(own.empty_posts_message, "Share your first post!");
        assert_eq!(own.bio, None);
        assert_eq!(own.stats[0].value, "1.5K");

        let other = ProfileHeaderView::new(&profile(user(None, None), true), false, &config);
        assert_eq!(other.follow_button, Some("Unfollow"));
        assert_eq!(other.empty_posts_message, "This user hasn't posted anything yet.");
    }

    #[test]
    fn suggestion_button_reflects_follow() {
        let config = Config::default();
        let u = user(Some("A"), Some("B"));
        assert_eq!(SuggestionView::new(&u, 0, false, &config).button_label(), "Follow");
        let followed = SuggestionView::new(&u, 0, true, &config);
        assert_eq!(followed.button_label(), "Following");
        assert_eq!(followed.followers_label, "0 followers");
    }
}
