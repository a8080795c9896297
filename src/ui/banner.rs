//! Banner drawing utilities for the UI.

use ratatui::{Frame, layout::Rect, text::{Line, Span}, widgets::{Block, Borders, Paragraph, Tabs}, style::{Style, Modifier, Color}};
use crate::app::App;
use crate::banner::{get_styled_banner_lines, BRAND};
use crate::state::Tab;
use crate::ui::components::Palette;

pub fn draw_full_banner(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let banner_lines = get_styled_banner_lines(area.width, app.ui.tick_count, palette.accent, palette.accent_dark);
    let banner = Paragraph::new(banner_lines)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(banner, area);
}

/// One-line header for the main screen: brand, tabs and the signed-in identity.
pub fn draw_nav_bar(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let block = Block::default().borders(Borders::BOTTOM);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let identity = app.current_user.as_ref().map(|user| {
        let avatar = crate::ui::view::AvatarView::for_identity(user, &app.config);
        vec![
            crate::ui::components::avatar_span(&avatar, &palette),
            Span::raw(" "),
            Span::raw(avatar.alt),
        ]
    }).unwrap_or_default();
    let identity_width: u16 = identity.iter().map(|s| s.width() as u16).sum();

    let layout = ratatui::layout::Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([
            ratatui::layout::Constraint::Length(BRAND.len() as u16 + 3),
            ratatui::layout::Constraint::Min(0),
            ratatui::layout::Constraint::Length(identity_width + 1),
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled(BRAND, Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))),
        layout[0],
    );

    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("F{} {}", i + 1, t.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.ui.tab.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    f.render_widget(tabs, layout[1]);

    f.render_widget(
        Paragraph::new(Line::from(identity)).alignment(ratatui::layout::Alignment::Right),
        layout[2],
    );
}
