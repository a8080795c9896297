//! Search tab.

use ratatui::{Frame, layout::{Alignment, Constraint, Layout, Rect}, text::{Line, Span}, widgets::{Block, Borders, Paragraph}, style::{Modifier, Style}};
use crate::app::App;
use crate::state::SearchStatus;
use crate::ui::components::{render_empty_state, render_search_result, Palette};
use crate::ui::view::SearchResultView;

pub fn draw_search(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let chunks = Layout::default()
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(app.search.query.as_str())
        .style(Style::default().fg(palette.accent))
        .block(Block::default().borders(Borders::ALL).title("Search users"));
    f.render_widget(input, chunks[0]);
    f.set_cursor_position((chunks[0].x + app.search.query.chars().count() as u16 + 1, chunks[0].y + 1));

    let block = Block::default().borders(Borders::ALL);
    let body: Vec<Line> = match app.search.status {
        SearchStatus::Placeholder => render_empty_state("[ search ]", "Search for users to connect with", "", &palette),
        SearchStatus::Searching => vec![Line::raw("Searching...")],
        SearchStatus::NoResults => render_empty_state("[ search ]", "No users found", "", &palette),
        SearchStatus::Results => {
            let mut lines = vec![
                Line::from(Span::styled("Search Results", Style::default().add_modifier(Modifier::BOLD))),
                Line::raw(""),
            ];
            for (i, user) in app.search.results.iter().enumerate() {
                let view = SearchResultView::new(user, &app.config);
                lines.extend(render_search_result(&view, i == app.search.selected, &palette));
            }
            lines
        }
    };
    let alignment = if app.search.status == SearchStatus::Results { Alignment::Left } else { Alignment::Center };
    f.render_widget(Paragraph::new(body).alignment(alignment).block(block), chunks[1]);
}
