// client/src/app.rs
// Application controller: turns key presses and service results into state.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::Event as CEvent;
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, AuthFailure};
use crate::model::{AuthUser, NewPost, Post, Session, Story, User, UserProfile};
use crate::services::{ApiService, AuthBroadcaster, AuthSnapshot, FileUpload, Services, Subscription, UploadService};
use crate::state::feed::apply_like;
use crate::state::{
    ms_to_ticks, AuthFormState, AuthMode, FeedState, Modal, NotificationState, ProfileState, Screen, SearchState,
    SidebarState, Tab, ToastKind, UiState, UploadState,
};
use crate::ui::debounce::Debouncer;
use crate::ui::preview::build_preview;

/// Result of an explicit sign-in, sign-up or sign-out.
#[derive(Debug)]
pub enum AuthOutcome {
    SignIn(Result<Session, AuthFailure>),
    SignUp(Result<Option<Session>, AuthFailure>),
    SignOut(Result<(), AuthFailure>),
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Terminal(CEvent),
    Tick,
    AuthChanged(AuthSnapshot),
    Auth(AuthOutcome),
    FeedLoaded { generation: u64, result: AppResult<Vec<Post>> },
    StoriesLoaded { generation: u64, result: AppResult<Vec<Story>> },
    UserCardLoaded { generation: u64, result: AppResult<UserProfile> },
    SuggestionsLoaded { generation: u64, result: AppResult<Vec<User>> },
    ProfileLoaded { generation: u64, result: AppResult<(UserProfile, Vec<Post>)> },
    /// The search box has been quiet for the debounce window.
    SearchDue { query: String },
    SearchLoaded { generation: u64, result: AppResult<Vec<User>> },
    LikeToggled { post_id: Uuid, liked: bool, result: AppResult<()> },
    SuggestionFollowed { user_id: Uuid, result: AppResult<()> },
    ProfileFollowToggled { user_id: Uuid, following: bool, result: AppResult<()> },
    UploadFinished(AppResult<Post>),
}

pub struct App {
    pub config: Arc<Config>,
    pub auth_service: Arc<AuthBroadcaster>,
    pub api: Arc<ApiService>,
    events: mpsc::UnboundedSender<AppEvent>,
    auth_subscription: Option<Subscription>,

    pub current_user: Option<AuthUser>,
    pub auth_loading: bool,

    pub ui: UiState,
    pub auth: AuthFormState,
    pub feed: FeedState,
    pub search: SearchState,
    pub profile: ProfileState,
    pub sidebar: SidebarState,
    pub upload: UploadState,
    pub notifications: NotificationState,

    pub picker: Picker,
    search_debouncer: Debouncer,
}

impl App {
    pub fn new(services: &Services, events: mpsc::UnboundedSender<AppEvent>, picker: Picker) -> App {
        let debounce = Duration::from_millis(services.config.search_debounce_ms);
        App {
            config: services.config.clone(),
            auth_service: services.auth.clone(),
            api: services.api.clone(),
            events,
            auth_subscription: None,
            current_user: None,
            auth_loading: true,
            ui: UiState::default(),
            auth: AuthFormState::default(),
            feed: FeedState::default(),
            search: SearchState::default(),
            profile: ProfileState::default(),
            sidebar: SidebarState::default(),
            upload: UploadState::default(),
            notifications: NotificationState::default(),
            picker,
            search_debouncer: Debouncer::new(debounce),
        }
    }

    /// Subscribes to auth changes and kicks off session discovery.
    pub fn start(&mut self) {
        let tx = self.events.clone();
        self.auth_subscription = Some(self.auth_service.subscribe(move |snapshot| {
            let _ = tx.send(AppEvent::AuthChanged(snapshot.clone()));
        }));
        let auth = self.auth_service.clone();
        tokio::spawn(async move { auth.initialize().await });
    }

    /// Runs `work` in the background and feeds its event back into the loop.
    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let _ = tx.send(work.await);
        });
    }

    pub fn viewer_id(&self) -> Option<Uuid> {
        self.current_user.as_ref().map(|u| u.id)
    }

    pub fn toast(&mut self, title: &str, message: impl Into<String>, kind: ToastKind) {
        let ticks = ms_to_ticks(self.config.toast_duration_ms);
        self.notifications.push(title, message, kind, ticks, self.ui.tick_count);
    }

    fn toast_error(&mut self, message: impl Into<String>) {
        self.toast("Error", message, ToastKind::Error);
    }

    fn toast_success(&mut self, message: impl Into<String>) {
        self.toast("Success", message, ToastKind::Success);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Terminal(CEvent::Key(key)) => crate::handlers::handle_key_event(key, self),
            AppEvent::Terminal(_) => {}
            AppEvent::Tick => self.on_tick(),
            AppEvent::AuthChanged(snapshot) => self.on_auth_changed(snapshot),
            AppEvent::Auth(outcome) => self.on_auth_outcome(outcome),
            AppEvent::FeedLoaded { generation, result } => self.on_feed_loaded(generation, result),
            AppEvent::StoriesLoaded { generation, result } => {
                if !self.feed.generation.is_current(generation) {
                    debug!(generation, "Discarding stale stories response");
                } else if let Ok(stories) = result {
                    self.feed.stories = stories;
                }
            }
            AppEvent::UserCardLoaded { generation, result } => {
                if !self.sidebar.card_generation.is_current(generation) {
                    debug!(generation, "Discarding stale user card response");
                } else if let Ok(profile) = result {
                    self.sidebar.user_card = Some(profile);
                }
            }
            AppEvent::SuggestionsLoaded { generation, result } => {
                if !self.sidebar.suggestions_generation.is_current(generation) {
                    debug!(generation, "Discarding stale suggestions response");
                } else if let Ok(users) = result {
                    let viewer = self.viewer_id();
                    self.sidebar.set_suggestions(users, viewer, self.config.suggestion_count);
                }
            }
            AppEvent::ProfileLoaded { generation, result } => self.on_profile_loaded(generation, result),
            AppEvent::SearchDue { query } => self.run_search(&query),
            AppEvent::SearchLoaded { generation, result } => self.on_search_loaded(generation, result),
            AppEvent::LikeToggled { post_id, liked, result } => self.on_like_toggled(post_id, liked, result),
            AppEvent::SuggestionFollowed { user_id, result } => self.on_suggestion_followed(user_id, result),
            AppEvent::ProfileFollowToggled { user_id, following, result } => {
                self.on_profile_follow_toggled(user_id, following, result)
            }
            AppEvent::UploadFinished(result) => self.on_upload_finished(result),
        }
    }

    pub fn on_tick(&mut self) {
        self.ui.tick();
        let tick = self.ui.tick_count;
        self.notifications.expire(tick);
        if let Some(progress) = self.upload.progress.as_mut() {
            progress.advance(tick, &mut rand::thread_rng());
        }
        if self.upload.close_at_tick.is_some_and(|at| tick >= at) {
            self.ui.close_modal(Modal::Upload);
            self.upload.reset();
            self.load_feed();
            self.toast_success("Post created successfully!");
        }
    }

    // --- Auth ---

    fn on_auth_changed(&mut self, snapshot: AuthSnapshot) {
        let previous_screen = self.ui.screen;
        let previous_user = self.viewer_id();
        self.current_user = snapshot.user;
        self.auth_loading = snapshot.loading;
        self.ui.screen = Screen::from_auth(self.current_user.is_some(), self.auth_loading);

        match self.ui.screen {
            Screen::Main if previous_screen != Screen::Main || previous_user != self.viewer_id() => {
                self.enter_main();
            }
            Screen::Login if previous_screen == Screen::Main => self.leave_main(),
            _ => {}
        }
    }

    /// Feed, own summary and suggestions load side by side.
    fn enter_main(&mut self) {
        self.auth.reset();
        self.ui.set_tab(Tab::Feed);
        self.load_feed();
        self.load_user_card();
        self.load_suggestions();
    }

    fn leave_main(&mut self) {
        self.search_debouncer.cancel();
        self.ui.close_all_modals();
        self.ui.set_tab(Tab::Feed);
        self.feed.clear();
        self.search.clear();
        self.profile.clear();
        self.sidebar.clear();
        self.upload.reset();
    }

    pub fn submit_auth(&mut self) {
        if self.auth.submitting {
            return;
        }
        if let Err(message) = self.auth.validate() {
            self.toast_error(message);
            return;
        }
        self.auth.submitting = true;
        let auth = self.auth_service.clone();
        let email = self.auth.email.trim().to_string();
        let password = self.auth.password.clone();
        match self.auth.mode {
            AuthMode::SignIn => self.spawn(async move {
                AppEvent::Auth(AuthOutcome::SignIn(auth.sign_in(&email, &password).await))
            }),
            AuthMode::SignUp => {
                let metadata = self.auth.metadata();
                self.spawn(async move {
                    AppEvent::Auth(AuthOutcome::SignUp(auth.sign_up(&email, &password, metadata).await))
                })
            }
        }
    }

    pub fn sign_out(&mut self) {
        let auth = self.auth_service.clone();
        self.spawn(async move { AppEvent::Auth(AuthOutcome::SignOut(auth.sign_out().await)) });
    }

    fn on_auth_outcome(&mut self, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::SignIn(result) => {
                self.auth.submitting = false;
                match result {
                    Ok(_) => self.toast_success("Signed in successfully!"),
                    Err(failure) => {
                        self.auth.password.clear();
                        self.toast_error(failure.message);
                    }
                }
            }
            AuthOutcome::SignUp(result) => {
                self.auth.submitting = false;
                match result {
                    Ok(_) => {
                        self.toast_success("Account created! Please check your email to verify your account.")
                    }
                    Err(failure) => self.toast_error(failure.message),
                }
            }
            AuthOutcome::SignOut(result) => match result {
                Ok(()) => self.toast_success("Signed out successfully"),
                Err(failure) => self.toast_error(failure.message),
            },
        }
    }

    // --- Tabs and sections ---

    pub fn switch_tab(&mut self, tab: Tab) {
        self.ui.set_tab(tab);
        match tab {
            Tab::Feed => self.load_feed(),
            Tab::Profile => {
                if let Some(id) = self.viewer_id() {
                    self.load_profile(id);
                }
            }
            // Search runs from the input box; messages and activity have nothing to load.
            Tab::Search | Tab::Messages | Tab::Activity => {}
        }
    }

    pub fn load_feed(&mut self) {
        let generation = self.feed.begin_load();
        let api = self.api.clone();
        self.spawn(async move { AppEvent::FeedLoaded { generation, result: api.get_posts(None).await } });
        let api = self.api.clone();
        self.spawn(async move { AppEvent::StoriesLoaded { generation, result: api.get_stories().await } });
    }

    fn on_feed_loaded(&mut self, generation: u64, result: AppResult<Vec<Post>>) {
        if !self.feed.generation.is_current(generation) {
            debug!(generation, "Discarding stale feed response");
            return;
        }
        match result {
            Ok(posts) => self.feed.set_posts(posts),
            Err(_) => {
                self.feed.loading = false;
                self.toast_error("Failed to load posts");
            }
        }
    }

    pub fn load_user_card(&mut self) {
        let Some(user_id) = self.viewer_id() else { return };
        let generation = self.sidebar.card_generation.next();
        let api = self.api.clone();
        self.spawn(async move { AppEvent::UserCardLoaded { generation, result: api.get_user_profile(user_id).await } });
    }

    pub fn load_suggestions(&mut self) {
        let generation = self.sidebar.suggestions_generation.next();
        let api = self.api.clone();
        self.spawn(async move { AppEvent::SuggestionsLoaded { generation, result: api.get_users("").await } });
    }

    /// Opens `user_id`'s profile on the profile tab.
    pub fn open_profile(&mut self, user_id: Uuid) {
        self.ui.set_tab(Tab::Profile);
        self.load_profile(user_id);
    }

    pub fn load_profile(&mut self, user_id: Uuid) {
        let generation = self.profile.begin_load(user_id, self.viewer_id());
        let api = self.api.clone();
        self.spawn(async move {
            let result = futures::try_join!(api.get_user_profile(user_id), api.get_posts(Some(user_id)));
            AppEvent::ProfileLoaded { generation, result }
        });
    }

    fn on_profile_loaded(&mut self, generation: u64, result: AppResult<(UserProfile, Vec<Post>)>) {
        if !self.profile.generation.is_current(generation) {
            debug!(generation, "Discarding stale profile response");
            return;
        }
        match result {
            Ok((profile, posts)) => self.profile.set_loaded(profile, posts),
            Err(_) => {
                self.profile.loading = false;
                self.toast_error("Failed to load profile");
            }
        }
    }

    // --- Search ---

    /// Called after every edit of the search box.
    pub fn on_search_input(&mut self) {
        let tx = self.events.clone();
        let query = self.search.query.clone();
        self.search_debouncer.call(async move {
            let _ = tx.send(AppEvent::SearchDue { query });
        });
    }

    /// An empty query shows the placeholder and never reaches the backend.
    pub fn run_search(&mut self, query: &str) {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.search.results.clear();
            self.search.status = crate::state::SearchStatus::Placeholder;
            self.search.generation.invalidate();
            return;
        }
        let generation = self.search.begin_search();
        let api = self.api.clone();
        self.spawn(async move { AppEvent::SearchLoaded { generation, result: api.get_users(&query).await } });
    }

    fn on_search_loaded(&mut self, generation: u64, result: AppResult<Vec<User>>) {
        if !self.search.generation.is_current(generation) {
            debug!(generation, "Discarding stale search response");
            return;
        }
        match result {
            Ok(users) => {
                let viewer = self.viewer_id();
                self.search.set_results(users.into_iter().filter(|u| Some(u.id) != viewer).collect());
            }
            Err(_) => {
                self.search.status = crate::state::SearchStatus::Placeholder;
                self.toast_error("Search failed");
            }
        }
    }

    /// Opens the highlighted result and resets the search box.
    pub fn open_selected_search_result(&mut self) {
        let Some(user_id) = self.search.selected_user().map(|u| u.id) else { return };
        self.search_debouncer.cancel();
        self.search.clear();
        self.open_profile(user_id);
    }

    // --- Likes and follows ---

    /// The post the current tab has highlighted.
    pub fn selected_post(&self) -> Option<&Post> {
        match self.ui.tab {
            Tab::Feed => self.feed.selected_post(),
            Tab::Profile => self.profile.selected_post(),
            _ => None,
        }
    }

    pub fn toggle_like_selected(&mut self) {
        let Some((post_id, liked)) = self.selected_post().map(|p| (p.id, p.is_liked)) else { return };
        self.toggle_like(post_id, liked);
    }

    pub fn toggle_like(&mut self, post_id: Uuid, currently_liked: bool) {
        if self.feed.pending_likes.contains(&post_id) {
            return;
        }
        self.feed.pending_likes.push(post_id);
        let api = self.api.clone();
        self.spawn(async move {
            let result = if currently_liked { api.unlike_post(post_id).await } else { api.like_post(post_id).await };
            AppEvent::LikeToggled { post_id, liked: !currently_liked, result }
        });
    }

    fn on_like_toggled(&mut self, post_id: Uuid, liked: bool, result: AppResult<()>) {
        self.feed.pending_likes.retain(|id| *id != post_id);
        match result {
            Ok(()) => {
                apply_like(&mut self.feed.posts, post_id, liked);
                apply_like(&mut self.profile.posts, post_id, liked);
            }
            Err(AppError::AlreadyLiked) => {
                apply_like(&mut self.feed.posts, post_id, true);
                apply_like(&mut self.profile.posts, post_id, true);
                self.toast_error(AppError::AlreadyLiked.user_message());
            }
            Err(_) => self.toast_error("Failed to update like"),
        }
    }

    pub fn follow_selected_suggestion(&mut self) {
        let Some(suggestion) = self.sidebar.selected_suggestion() else { return };
        if suggestion.followed || suggestion.pending {
            return;
        }
        let user_id = suggestion.user.id;
        if let Some(s) = self.sidebar.suggestion_mut(user_id) {
            s.pending = true;
        }
        let api = self.api.clone();
        self.spawn(async move { AppEvent::SuggestionFollowed { user_id, result: api.follow_user(user_id).await } });
    }

    fn on_suggestion_followed(&mut self, user_id: Uuid, result: AppResult<()>) {
        let outcome = match &result {
            Ok(()) => Some(Ok(())),
            Err(AppError::AlreadyFollowing) => Some(Err(AppError::AlreadyFollowing.user_message())),
            Err(_) => None,
        };
        if let Some(s) = self.sidebar.suggestion_mut(user_id) {
            s.pending = false;
            s.followed = outcome.is_some();
        }
        match outcome {
            Some(Ok(())) => {
                self.toast_success("User followed successfully");
                self.load_user_card();
            }
            Some(Err(message)) => self.toast_error(message),
            None => self.toast_error("Failed to follow user"),
        }
    }

    pub fn toggle_profile_follow(&mut self) {
        if self.profile.is_own || self.profile.follow_pending {
            return;
        }
        let Some(profile) = self.profile.profile.as_ref() else { return };
        let user_id = profile.user.id;
        let following = profile.is_following;
        self.profile.follow_pending = true;
        let api = self.api.clone();
        self.spawn(async move {
            let result = if following { api.unfollow_user(user_id).await } else { api.follow_user(user_id).await };
            AppEvent::ProfileFollowToggled { user_id, following: !following, result }
        });
    }

    fn on_profile_follow_toggled(&mut self, user_id: Uuid, following: bool, result: AppResult<()>) {
        let same_target = self.profile.target == Some(user_id);
        if same_target {
            self.profile.follow_pending = false;
        }
        match result {
            Ok(()) => {
                if same_target {
                    self.profile.apply_follow(following);
                }
                let verb = if following { "followed" } else { "unfollowed" };
                self.toast_success(format!("User {} successfully", verb));
                self.load_user_card();
            }
            Err(AppError::AlreadyFollowing) => {
                if same_target {
                    self.profile.apply_follow(true);
                }
                self.toast_error(AppError::AlreadyFollowing.user_message());
            }
            Err(_) => self.toast_error("Failed to update follow status"),
        }
    }

    // --- Upload ---

    pub fn open_upload_modal(&mut self) {
        self.ui.open_modal(Modal::Upload);
    }

    pub fn close_modals(&mut self) {
        self.ui.close_all_modals();
    }

    pub fn cancel_upload(&mut self) {
        self.ui.close_modal(Modal::Upload);
        self.upload.reset();
    }

    /// Reads the entered path, validates the file and prepares the preview.
    pub fn choose_file(&mut self) {
        let raw = self.upload.path_input.trim();
        if raw.is_empty() {
            self.toast_error("No file selected");
            return;
        }
        let path = expand_home(raw);
        let file = match FileUpload::from_path(&path) {
            Ok(file) => file,
            Err(e) => {
                self.toast_error(e.user_message());
                return;
            }
        };
        let errors = UploadService::validate_file(Some(&file), &self.config);
        if !errors.is_empty() {
            self.toast_error(errors.join(", "));
            return;
        }
        let preview = match build_preview(&mut self.picker, &file.bytes) {
            Ok(protocol) => Some(protocol),
            Err(e) => {
                debug!(error = %e, "No preview for selected file");
                None
            }
        };
        self.upload.select_file(file, preview);
    }

    /// Uploads the file, then creates the post. The two calls are not atomic.
    pub fn submit_upload(&mut self) {
        if self.upload.submitting {
            return;
        }
        let Some(file) = self.upload.file.clone() else {
            self.toast_error("Please select a file");
            return;
        };
        self.upload.begin_submit(self.ui.tick_count);
        let caption = self.upload.caption_value();
        let api = self.api.clone();
        self.spawn(async move {
            let result = async {
                let uploaded = api.upload_file(&file).await?;
                api.create_post(NewPost { image_url: uploaded.url, caption }).await
            }
            .await;
            AppEvent::UploadFinished(result)
        });
    }

    fn on_upload_finished(&mut self, result: AppResult<Post>) {
        match result {
            Ok(_) => {
                if let Some(progress) = self.upload.progress.as_mut() {
                    progress.finish();
                }
                self.upload.close_at_tick = Some(self.ui.tick_count + ms_to_ticks(1000));
            }
            Err(_) => {
                self.upload.fail();
                self.toast_error("Failed to create post");
            }
        }
    }

    pub fn request_quit(&mut self) {
        self.ui.show_quit_confirm = true;
        self.ui.quit_confirm_selected = 1;
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => std::env::var("HOME").map(|h| PathBuf::from(h).join(rest)).unwrap_or_else(|_| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_prefix_is_expanded() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_home("~/pics/a.png"), PathBuf::from("/home/tester/pics/a.png"));
        assert_eq!(expand_home("/tmp/a.png"), PathBuf::from("/tmp/a.png"));
    }
}
