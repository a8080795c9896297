use super::RequestGeneration;
use crate::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Empty query: "Search for users to connect with".
    Placeholder,
    Searching,
    NoResults,
    Results,
}

pub struct SearchState {
    pub query: String,
    pub results: Vec<User>,
    pub status: SearchStatus,
    pub selected: usize,
    pub generation: RequestGeneration,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            status: SearchStatus::Placeholder,
            selected: 0,
            generation: RequestGeneration::default(),
        }
    }
}

impl SearchState {
    /// Back to the placeholder; anything in flight is discarded.
    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.selected = 0;
        self.status = SearchStatus::Placeholder;
        self.generation.invalidate();
    }

    pub fn begin_search(&mut self) -> u64 {
        self.status = SearchStatus::Searching;
        self.generation.next()
    }

    pub fn set_results(&mut self, results: Vec<User>) {
        self.status = if results.is_empty() { SearchStatus::NoResults } else { SearchStatus::Results };
        self.results = results;
        self.selected = 0;
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.results.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_invalidates_in_flight_search() {
        let mut search = SearchState::default();
        search.query = "ana".into();
        let token = search.begin_search();
        search.clear();
        assert_eq!(search.status, SearchStatus::Placeholder);
        assert!(!search.generation.is_current(token));
    }

    #[test]
    fn empty_results_show_no_results() {
        let mut search = SearchState::default();
        search.begin_search();
        search.set_results(Vec::new());
        assert_eq!(search.status, SearchStatus::NoResults);
    }
}
