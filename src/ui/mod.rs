//! Main UI module. Re-exports submodules and provides the main entry point.

pub mod auth;
pub mod banner;
pub mod components;
pub mod debounce;
pub mod feed;
pub mod format;
pub mod popups;
pub mod preview;
pub mod profile;
pub mod search;
pub mod sidebar;
pub mod view;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use crate::app::App;
use crate::state::{Modal, Screen, Tab};
use crate::ui::components::{render_empty_state, Palette};

pub fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();
    let banner_height = match app.ui.screen {
        Screen::Loading | Screen::Login => 9,
        Screen::Main => 2,
    };
    let chunks = Layout::default()
        .constraints([
            Constraint::Length(banner_height), // Banner height
            Constraint::Min(0),                // Main Content
            Constraint::Length(3),             // Footer
        ])
        .split(size);

    match app.ui.screen {
        Screen::Loading | Screen::Login => banner::draw_full_banner(f, app, chunks[0]),
        Screen::Main => banner::draw_nav_bar(f, app, chunks[0]),
    }

    draw_footer(f, app, chunks[2]);

    let main_area = chunks[1];
    match app.ui.screen {
        Screen::Loading => auth::draw_loading(f, app, main_area),
        Screen::Login => auth::draw_auth_form(f, app, main_area),
        Screen::Main => draw_main(f, app, main_area),
    }

    for modal in app.ui.modals.clone() {
        match modal {
            Modal::Upload => popups::draw_upload_modal(f, app),
            Modal::Messaging => popups::draw_messaging_modal(f, app),
        }
    }

    popups::draw_toasts(f, app);

    if app.ui.show_quit_confirm {
        popups::draw_quit_confirm_popup(f, app);
    }
}

fn draw_main(f: &mut Frame, app: &App, area: Rect) {
    // The sidebar goes away on narrow terminals.
    let columns = if area.width >= 100 {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(36)])
            .split(area)
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0)])
            .split(area)
    };

    match app.ui.tab {
        Tab::Feed => feed::draw_feed(f, app, columns[0]),
        Tab::Search => search::draw_search(f, app, columns[0]),
        Tab::Profile => profile::draw_profile(f, app, columns[0]),
        Tab::Messages => draw_placeholder(f, app, columns[0], "Messages", "Your conversations will show up here."),
        Tab::Activity => draw_placeholder(f, app, columns[0], "Activity", "Likes and follows will show up here."),
    }

    if let Some(sidebar_area) = columns.get(1) {
        sidebar::draw_sidebar(f, app, *sidebar_area);
    }
}

fn draw_placeholder(f: &mut Frame, app: &App, area: Rect, title: &str, hint: &str) {
    let palette = Palette::from(&app.config.brand_colors);
    let lines = render_empty_state("[ soon ]", title, hint, &palette);
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(Block::default().borders(Borders::ALL).title(title.to_string())),
        area,
    );
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match (app.ui.screen, app.ui.top_modal(), app.ui.tab) {
        (Screen::Loading, _, _) => "[Esc] Quit",
        (Screen::Login, _, _) => "[Esc] QUIT\n[Tab]/[Shift+Tab] Change Focus | [Enter] Select/Submit",
        (Screen::Main, Some(Modal::Upload), _) => "[Tab] Change Focus | [Enter] Choose/Share\n[Esc] Close",
        (Screen::Main, Some(Modal::Messaging), _) => "[Esc] Close",
        (Screen::Main, None, Tab::Search) => "[F1-F5]/[←→] Tabs | type to search\n[↑↓] Select | [Enter] Open Profile | [Esc] Clear",
        (Screen::Main, None, _) => {
            "[F1-F5]/[←→] Tabs | [Tab] Pane | [↑↓] Nav | [Enter] Profile | [l] Like | [f] Follow\n[n] New Post | [m] Messages | [r] Refresh | [Ctrl+O] Sign Out | [q] Quit"
        }
    };
    let status_text = match &app.current_user {
        Some(user) => format!("Signed in as: {}", user.email.clone().unwrap_or_default()),
        None => "Not signed in".to_string(),
    };

    let footer_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(67), // Help text area
            Constraint::Percentage(33), // Status area
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(help_text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::TOP)),
        footer_chunks[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(status_text, Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Right)
            .block(Block::default().borders(Borders::TOP)),
        footer_chunks[1],
    );
}
