//! Profile tab: header, stats and that user's posts.

use ratatui::{Frame, layout::{Alignment, Constraint, Layout, Rect}, widgets::{Block, Borders, Paragraph, Wrap}};
use crate::app::App;
use crate::state::Pane;
use crate::ui::components::{render_empty_state, render_profile_header, Palette};
use crate::ui::feed::draw_post_list;
use crate::ui::view::ProfileHeaderView;

pub fn draw_profile(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let Some(profile) = app.profile.profile.as_ref().filter(|_| !app.profile.loading) else {
        f.render_widget(
            Paragraph::new("Loading profile...").block(Block::default().borders(Borders::ALL).title("Profile")),
            area,
        );
        return;
    };

    let header = ProfileHeaderView::new(profile, app.profile.is_own, &app.config);
    let header_lines = render_profile_header(&header, &palette);
    let chunks = Layout::default()
        .constraints([Constraint::Length(header_lines.len() as u16 + 2), Constraint::Min(0)])
        .split(area);
    f.render_widget(
        Paragraph::new(header_lines).wrap(Wrap { trim: true }).block(Block::default().borders(Borders::ALL).title("Profile")),
        chunks[0],
    );

    let posts_block = Block::default().borders(Borders::ALL).title("Posts");
    if app.profile.posts.is_empty() {
        let lines = render_empty_state("[ camera ]", "No posts yet", header.empty_posts_message, &palette);
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(posts_block), chunks[1]);
        return;
    }
    let highlight = app.ui.pane == Pane::Content;
    draw_post_list(f, app, chunks[1], &app.profile.posts, app.profile.selected, highlight, posts_block);
}
