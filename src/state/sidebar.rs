use uuid::Uuid;

use super::RequestGeneration;
use crate::model::{User, UserProfile};

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub user: User,
    /// Followed from this tile; the button then reads "Following" and is disabled.
    pub followed: bool,
    pub pending: bool,
}

/// Right-hand column: the viewer's card and who to follow
#[derive(Default)]
pub struct SidebarState {
    pub user_card: Option<UserProfile>,
    pub suggestions: Vec<Suggestion>,
    pub selected: usize,
    pub card_generation: RequestGeneration,
    pub suggestions_generation: RequestGeneration,
}

impl SidebarState {
    /// Everyone except the viewer, capped at `limit`.
    pub fn set_suggestions(&mut self, users: Vec<User>, viewer: Option<Uuid>, limit: usize) {
        self.suggestions = users
            .into_iter()
            .filter(|u| Some(u.id) != viewer)
            .take(limit)
            .map(|user| Suggestion { user, followed: false, pending: false })
            .collect();
        self.selected = 0;
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.suggestions.get(self.selected)
    }

    pub fn suggestion_mut(&mut self, user_id: Uuid) -> Option<&mut Suggestion> {
        self.suggestions.iter_mut().find(|s| s.user.id == user_id)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.suggestions.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn clear(&mut self) {
        self.user_card = None;
        self.suggestions.clear();
        self.selected = 0;
        self.card_generation.invalidate();
        self.suggestions_generation.invalidate();
    }
}
