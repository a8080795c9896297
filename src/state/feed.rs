use uuid::Uuid;

use super::RequestGeneration;
use crate::model::{Post, Story};

/// Adjusts a post's like flag and count after a confirmed toggle.
pub fn apply_like(posts: &mut [Post], post_id: Uuid, liked: bool) {
    if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
        if post.is_liked != liked {
            post.is_liked = liked;
            post.likes_count = if liked { post.likes_count + 1 } else { post.likes_count.saturating_sub(1) };
        }
    }
}

#[derive(Default)]
pub struct FeedState {
    pub posts: Vec<Post>,
    pub stories: Vec<Story>,
    pub loading: bool,
    pub loaded: bool,
    pub selected: usize,
    pub generation: RequestGeneration,
    /// Posts with a like/unlike request in flight.
    pub pending_likes: Vec<Uuid>,
}

impl FeedState {
    /// Starts a load and returns its generation token.
    pub fn begin_load(&mut self) -> u64 {
        self.loading = true;
        self.generation.next()
    }

    pub fn set_posts(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.loading = false;
        self.loaded = true;
        self.selected = self.selected.min(self.posts.len().saturating_sub(1));
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.posts.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.posts.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clear(&mut self) {
        self.generation.invalidate();
        self.posts.clear();
        self.stories.clear();
        self.loading = false;
        self.loaded = false;
        self.selected = 0;
        self.pending_likes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(likes: u64, liked: bool) -> Post {
        Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user: None,
            image_url: String::new(),
            caption: None,
            created_at: Utc::now(),
            likes_count: likes,
            is_liked: liked,
            comments_count: 0,
        }
    }

    #[test]
    fn like_then_unlike_restores_count() {
        let mut posts = vec![post(3, false)];
        let id = posts[0].id;
        apply_like(&mut posts, id, true);
        assert_eq!((posts[0].likes_count, posts[0].is_liked), (4, true));
        apply_like(&mut posts, id, true);
        assert_eq!(posts[0].likes_count, 4);
        apply_like(&mut posts, id, false);
        assert_eq!((posts[0].likes_count, posts[0].is_liked), (3, false));
    }

    #[test]
    fn selection_is_clamped_on_reload() {
        let mut feed = FeedState::default();
        feed.set_posts(vec![post(0, false), post(0, false), post(0, false)]);
        feed.select_next();
        feed.select_next();
        feed.select_next();
        assert_eq!(feed.selected, 2);
        feed.set_posts(vec![post(0, false)]);
        assert_eq!(feed.selected, 0);
        feed.select_prev();
        assert_eq!(feed.selected, 0);
    }
}
