pub mod auth;
pub mod feed;
pub mod notification;
pub mod profile;
pub mod search;
pub mod sidebar;
pub mod ui;
pub mod upload;

pub use auth::{AuthFocus, AuthFormState, AuthMode};
pub use feed::FeedState;
pub use notification::{NotificationState, Toast, ToastKind};
pub use profile::ProfileState;
pub use search::{SearchState, SearchStatus};
pub use sidebar::{SidebarState, Suggestion};
pub use ui::{Modal, Pane, Screen, Tab, UiState};
pub use upload::{SimulatedProgress, UploadFocus, UploadState};

/// Milliseconds per UI tick; the terminal loop ticks at this rate.
pub const TICK_MS: u64 = 50;

pub fn ms_to_ticks(ms: u64) -> u64 {
    ms.div_ceil(TICK_MS)
}

/// Monotonic token stamped on each section load.
///
/// A response is applied only if it carries the latest token, so a slow
/// earlier request can never overwrite a newer one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    /// Starts a new request and returns its token.
    pub fn next(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.current
    }

    /// Invalidates whatever is in flight without starting a new request.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_generation_is_current() {
        let mut generation = RequestGeneration::default();
        let first = generation.next();
        let second = generation.next();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        generation.invalidate();
        assert!(!generation.is_current(second));
    }

    #[test]
    fn toast_duration_in_ticks() {
        assert_eq!(ms_to_ticks(5000), 100);
        assert_eq!(ms_to_ticks(1), 1);
        assert_eq!(ms_to_ticks(0), 0);
    }
}
