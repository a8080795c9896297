use crate::app::App;
use crate::state::{Modal, Pane, Tab};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle input on the main screen with no modal open
pub fn handle_main_input(key: KeyEvent, app: &mut App) {
    if handle_global_shortcuts(key, app) {
        return;
    }
    if app.ui.tab == Tab::Search {
        handle_search_input(key, app);
    } else {
        handle_section_input(key, app);
    }
}

/// Shortcuts that work on every tab. Returns true when the key was consumed.
pub fn handle_global_shortcuts(key: KeyEvent, app: &mut App) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('u') | KeyCode::Char('n') => app.open_upload_modal(),
            KeyCode::Char('o') => app.sign_out(),
            _ => return false,
        }
        return true;
    }

    match key.code {
        KeyCode::F(n @ 1..=5) => {
            app.switch_tab(Tab::ALL[usize::from(n) - 1]);
        }
        KeyCode::Left => app.switch_tab(app.ui.tab.prev()),
        KeyCode::Right => app.switch_tab(app.ui.tab.next()),
        _ => return false,
    }
    true
}

fn handle_search_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => {
            if app.search.query.is_empty() {
                app.notifications.dismiss_latest();
            } else {
                app.search.query.clear();
                app.on_search_input();
            }
        }
        KeyCode::Up => app.search.select_prev(),
        KeyCode::Down => app.search.select_next(),
        KeyCode::Enter => app.open_selected_search_result(),
        KeyCode::Backspace => {
            if app.search.query.pop().is_some() {
                app.on_search_input();
            }
        }
        KeyCode::Char(c) => {
            app.search.query.push(c);
            app.on_search_input();
        }
        _ => {}
    }
}

fn handle_section_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => {
            app.notifications.dismiss_latest();
        }
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Tab => app.ui.toggle_pane(),
        KeyCode::Char('/') => app.switch_tab(Tab::Search),
        KeyCode::Char('n') => app.open_upload_modal(),
        KeyCode::Char('m') => app.ui.open_modal(Modal::Messaging),
        KeyCode::Char('p') => app.switch_tab(Tab::Profile),
        KeyCode::Char('r') => refresh(app),
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, false),
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, true),
        KeyCode::Char('l') if app.ui.pane == Pane::Content => app.toggle_like_selected(),
        KeyCode::Char('f') => match app.ui.pane {
            Pane::Sidebar => app.follow_selected_suggestion(),
            Pane::Content if app.ui.tab == Tab::Profile => app.toggle_profile_follow(),
            Pane::Content => {}
        },
        KeyCode::Char('v') if app.ui.pane == Pane::Sidebar => app.switch_tab(Tab::Profile),
        KeyCode::Enter | KeyCode::Char('o') => open_selected(app),
        _ => {}
    }
}

fn refresh(app: &mut App) {
    match app.ui.tab {
        Tab::Feed => app.load_feed(),
        Tab::Profile => {
            if let Some(target) = app.profile.target {
                app.load_profile(target);
            }
        }
        _ => {}
    }
    app.load_user_card();
    app.load_suggestions();
}

fn move_selection(app: &mut App, down: bool) {
    match (app.ui.pane, app.ui.tab) {
        (Pane::Sidebar, _) => {
            if down {
                app.sidebar.select_next()
            } else {
                app.sidebar.select_prev()
            }
        }
        (Pane::Content, Tab::Feed) => {
            if down {
                app.feed.select_next()
            } else {
                app.feed.select_prev()
            }
        }
        (Pane::Content, Tab::Profile) => {
            if down {
                app.profile.select_next()
            } else {
                app.profile.select_prev()
            }
        }
        _ => {}
    }
}

/// Opens the profile behind whatever is highlighted.
fn open_selected(app: &mut App) {
    let target = match app.ui.pane {
        Pane::Sidebar => app.sidebar.selected_suggestion().map(|s| s.user.id),
        Pane::Content => app.selected_post().map(|p| p.user_id),
    };
    if let Some(user_id) = target {
        app.ui.pane = Pane::Content;
        app.open_profile(user_id);
    }
}
