//! Feed tab: stories strip and post cards.

use chrono::Utc;
use ratatui::{Frame, layout::{Constraint, Layout, Rect}, text::{Line, Span}, widgets::{Block, Borders, Paragraph, Wrap}, style::Style};
use crate::app::App;
use crate::model::Post;
use crate::state::Pane;
use crate::ui::components::{render_empty_state, render_post_card, render_story, Palette};
use crate::ui::view::{PostCardView, StoryView};

pub fn draw_feed(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let chunks = Layout::default()
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    draw_stories(f, app, chunks[0], &palette);

    let block = Block::default().borders(Borders::ALL).title("Feed");
    if app.feed.loading && !app.feed.loaded {
        f.render_widget(Paragraph::new("Loading posts...").block(block), chunks[1]);
        return;
    }
    if app.feed.posts.is_empty() {
        let lines = render_empty_state(
            "[ camera ]",
            "No posts yet",
            "Follow some users or create your first post to see content here. Press [n] to create a post.",
            &palette,
        );
        f.render_widget(
            Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center).wrap(Wrap { trim: true }).block(block),
            chunks[1],
        );
        return;
    }
    let highlight = app.ui.pane == Pane::Content;
    draw_post_list(f, app, chunks[1], &app.feed.posts, app.feed.selected, highlight, block);
}

fn draw_stories(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let now = Utc::now();
    let mut spans: Vec<Span> = Vec::new();
    for story in &app.feed.stories {
        spans.extend(render_story(&StoryView::new(story, &app.config, now), palette));
    }
    if spans.is_empty() {
        spans.push(Span::styled("No active stories", Style::default().fg(palette.muted)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Stories")),
        area,
    );
}

/// Post cards with the selected one kept in view.
pub fn draw_post_list(f: &mut Frame, app: &App, area: Rect, posts: &[Post], selected: usize, highlight: bool, block: Block) {
    let palette = Palette::from(&app.config.brand_colors);
    let now = Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_top = 0usize;
    let mut selected_bottom = 0usize;
    for (i, post) in posts.iter().enumerate() {
        let is_selected = highlight && i == selected;
        if i == selected {
            selected_top = lines.len();
        }
        lines.extend(render_post_card(&PostCardView::new(post, &app.config, now), is_selected, &palette));
        if i == selected {
            selected_bottom = lines.len();
        }
    }

    let visible = area.height.saturating_sub(2) as usize;
    let scroll = scroll_offset(selected_top, selected_bottom, visible);
    f.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

/// First line to show so the selected card's bottom fits, saturating at `u16::MAX`.
fn scroll_offset(selected_top: usize, selected_bottom: usize, visible: usize) -> u16 {
    let scroll = if selected_bottom > visible {
        selected_top.min(selected_bottom - visible)
    } else {
        0
    };
    u16::try_from(scroll).unwrap_or(u16::MAX)
}
