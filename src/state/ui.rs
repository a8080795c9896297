/// Top-level screen, derived from the auth snapshot.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Screen {
    Loading,
    Login,
    Main,
}

impl Screen {
    pub fn from_auth(signed_in: bool, loading: bool) -> Self {
        match (loading, signed_in) {
            (true, _) => Screen::Loading,
            (false, true) => Screen::Main,
            (false, false) => Screen::Login,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Tab {
    Feed,
    Search,
    Profile,
    Messages,
    Activity,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Feed, Tab::Search, Tab::Profile, Tab::Messages, Tab::Activity];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Feed => "Feed",
            Tab::Search => "Search",
            Tab::Profile => "Profile",
            Tab::Messages => "Messages",
            Tab::Activity => "Activity",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(&self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Modal {
    Upload,
    Messaging,
}

/// Which pane of the main screen receives navigation keys.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Pane {
    Content,
    Sidebar,
}

/// State management for UI-specific state
pub struct UiState {
    pub screen: Screen,
    pub tab: Tab,
    pub pane: Pane,
    pub should_quit: bool,
    pub tick_count: u64,

    /// Open modals, most recent last.
    pub modals: Vec<Modal>,

    // Quit confirmation
    pub show_quit_confirm: bool,
    pub quit_confirm_selected: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Loading,
            tab: Tab::Feed,
            pane: Pane::Content,
            should_quit: false,
            tick_count: 0,
            modals: Vec::new(),
            show_quit_confirm: false,
            quit_confirm_selected: 0,
        }
    }
}

impl UiState {
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn open_modal(&mut self, modal: Modal) {
        if !self.modals.contains(&modal) {
            self.modals.push(modal);
        }
    }

    pub fn close_modal(&mut self, modal: Modal) {
        self.modals.retain(|m| *m != modal);
    }

    pub fn close_all_modals(&mut self) {
        self.modals.clear();
    }

    pub fn top_modal(&self) -> Option<Modal> {
        self.modals.last().copied()
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        self.modals.contains(&modal)
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Content => Pane::Sidebar,
            Pane::Sidebar => Pane::Content,
        };
    }
}
