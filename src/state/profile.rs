use uuid::Uuid;

use super::RequestGeneration;
use crate::model::{Post, UserProfile};

/// State of the profile tab
#[derive(Default)]
pub struct ProfileState {
    pub target: Option<Uuid>,
    pub profile: Option<UserProfile>,
    pub posts: Vec<Post>,
    pub is_own: bool,
    pub loading: bool,
    pub selected: usize,
    pub generation: RequestGeneration,
    /// A follow/unfollow request is in flight.
    pub follow_pending: bool,
}

impl ProfileState {
    pub fn begin_load(&mut self, target: Uuid, viewer: Option<Uuid>) -> u64 {
        self.target = Some(target);
        self.is_own = viewer == Some(target);
        self.loading = true;
        self.profile = None;
        self.posts.clear();
        self.selected = 0;
        self.follow_pending = false;
        self.generation.next()
    }

    pub fn set_loaded(&mut self, profile: UserProfile, posts: Vec<Post>) {
        self.profile = Some(profile);
        self.posts = posts;
        self.loading = false;
    }

    /// Mirrors a confirmed follow toggle into the header counts.
    pub fn apply_follow(&mut self, following: bool) {
        if let Some(profile) = self.profile.as_mut() {
            if profile.is_following != following {
                profile.is_following = following;
                profile.followers_count = if following {
                    profile.followers_count + 1
                } else {
                    profile.followers_count.saturating_sub(1)
                };
            }
        }
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
        let generation = self.generation;
        *self = Self { generation, ..Self::default() };
        self.generation.invalidate();
    }
}
