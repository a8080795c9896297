use ratatui::{Frame, layout::{Constraint, Layout, Rect}, text::Line, widgets::{Block, Borders, Paragraph}, style::Style};
use crate::app::App;
use crate::state::Pane;
use crate::ui::components::{render_suggestion, render_user_card, Palette};
use crate::ui::view::{SuggestionView, UserCardView};

pub fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let focused = app.ui.pane == Pane::Sidebar;
    let border_style = if focused { Style::default().fg(palette.accent) } else { Style::default() };
    let chunks = Layout::default()
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let card_lines = match (&app.sidebar.user_card, &app.current_user) {
        (Some(profile), Some(identity)) => render_user_card(&UserCardView::new(profile, identity, &app.config), &palette),
        _ => vec![Line::raw("Loading...")],
    };
    f.render_widget(Paragraph::new(card_lines).block(Block::default().borders(Borders::ALL)), chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    for (i, suggestion) in app.sidebar.suggestions.iter().enumerate() {
        // The user list carries no follower counts.
        let view = SuggestionView::new(&suggestion.user, 0, suggestion.followed, &app.config);
        lines.extend(render_suggestion(&view, focused && i == app.sidebar.selected, &palette));
        lines.push(Line::raw(""));
    }
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default().borders(Borders::ALL).border_style(border_style).title("Suggestions for you"),
        ),
        chunks[1],
    );
}
