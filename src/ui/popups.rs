//! Popups: toasts, create-post modal, messaging modal, quit confirmation.

use ratatui::{Frame, layout::{Rect, Layout, Constraint, Direction}, style::{Style, Color}, widgets::{Block, Paragraph, Borders, BorderType, Clear, Gauge, Wrap}, text::{Line, Span}, layout::Alignment};
use ratatui::style::Modifier;
use crate::app::App;
use crate::state::UploadFocus;
use crate::ui::components::{render_toast, Palette};
use crate::ui::format::format_file_size;

pub fn draw_centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default().direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2), Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ]).split(r);
    Layout::default().direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2), Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ]).split(popup_layout[1])[1]
}

/// Toasts stack in the top-right corner, newest on top.
pub fn draw_toasts(f: &mut Frame, app: &App) {
    let size = f.area();
    let width = 44u16.min(size.width.saturating_sub(2));
    let mut y = size.y + 1;
    for toast in app.notifications.toasts.iter().rev() {
        let lines = render_toast(toast);
        let inner_width = width.saturating_sub(2).max(1) as usize;
        let wrapped: u16 = lines.iter().map(|l| l.width().max(1).div_ceil(inner_width) as u16).sum();
        let height = wrapped + 2;
        if y + height > size.y + size.height {
            break;
        }
        let area = Rect { x: size.x + size.width.saturating_sub(width + 1), y, width, height };
        let block = Block::default().borders(Borders::ALL).border_type(BorderType::Rounded);
        f.render_widget(Clear, area);
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), area);
        y += height;
    }
}

fn button(label: &str, focused: bool, enabled: bool, palette: &Palette) -> Span<'static> {
    let style = if !enabled {
        Style::default().fg(palette.muted)
    } else if focused {
        Style::default().fg(Color::Black).bg(palette.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.accent)
    };
    Span::styled(format!("[ {} ]", label), style)
}

pub fn draw_upload_modal(f: &mut Frame, app: &mut App) {
    let palette = Palette::from(&app.config.brand_colors);
    let area = draw_centered_rect(f.area(), 70, 80);
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(Span::styled(" Create New Post ", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Double);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default().margin(1).constraints([
        Constraint::Length(3), // path
        Constraint::Min(4),    // preview
        Constraint::Length(3), // caption
        Constraint::Length(1), // progress
        Constraint::Length(1), // buttons
    ]).split(inner);

    let upload = &app.upload;
    let focus_style = |focus: UploadFocus| {
        if upload.focus == focus && !upload.submitting { Style::default().fg(palette.accent) } else { Style::default() }
    };

    f.render_widget(
        Paragraph::new(upload.path_input.as_str())
            .style(focus_style(UploadFocus::Path))
            .block(Block::default().borders(Borders::ALL).title("Image file path ([Enter] to choose)")),
        chunks[0],
    );

    let caption_title = "Caption";
    f.render_widget(
        Paragraph::new(upload.caption.as_str())
            .style(focus_style(UploadFocus::Caption))
            .block(Block::default().borders(Borders::ALL).title(caption_title)),
        chunks[2],
    );

    if let Some(progress) = upload.progress.as_ref() {
        f.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(palette.accent))
                .ratio(progress.ratio())
                .label(progress.label()),
            chunks[3],
        );
    }

    let enabled = upload.submit_enabled();
    let buttons = Line::from(vec![
        button("Share", upload.focus == UploadFocus::Submit, enabled, &palette),
        Span::raw("   "),
        button("Cancel", upload.focus == UploadFocus::Cancel, !upload.submitting, &palette),
    ]);
    f.render_widget(Paragraph::new(buttons).alignment(Alignment::Center), chunks[4]);

    match upload.focus {
        UploadFocus::Path if !upload.submitting => {
            f.set_cursor_position((chunks[0].x + upload.path_input.chars().count() as u16 + 1, chunks[0].y + 1));
        }
        UploadFocus::Caption if !upload.submitting => {
            f.set_cursor_position((chunks[2].x + upload.caption.chars().count() as u16 + 1, chunks[2].y + 1));
        }
        _ => {}
    }

    let preview_title = match app.upload.file.as_ref() {
        Some(file) => format!("{} ({})", file.name, format_file_size(file.size)),
        None => "Preview".to_string(),
    };
    let preview_block = Block::default().borders(Borders::ALL).title(preview_title);
    let preview_area = preview_block.inner(chunks[1]);
    f.render_widget(preview_block, chunks[1]);
    match app.upload.preview.as_mut() {
        Some(protocol) => {
            let image_widget = ratatui_image::StatefulImage::default().resize(ratatui_image::Resize::Fit(None));
            f.render_stateful_widget(image_widget, preview_area, protocol);
        }
        None => {
            let hint = if app.upload.file.is_some() { "No preview available" } else { "Choose an image to share" };
            f.render_widget(
                Paragraph::new(Span::styled(hint, Style::default().fg(palette.muted))).alignment(Alignment::Center),
                preview_area,
            );
        }
    }
}

pub fn draw_messaging_modal(f: &mut Frame, app: &App) {
    let palette = Palette::from(&app.config.brand_colors);
    let area = draw_centered_rect(f.area(), 50, 30);
    f.render_widget(Clear, area);
    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled("Messages", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("Direct messaging is coming soon.", Style::default().fg(palette.muted))),
        Line::raw(""),
        Line::from(Span::styled("[Esc] Close", Style::default().fg(palette.muted))),
    ];
    let block = Block::default().title("Messages").borders(Borders::ALL).border_type(BorderType::Double);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}

pub fn draw_quit_confirm_popup(f: &mut Frame, app: &App) {
    let palette = Palette::from(&app.config.brand_colors);
    let screen = f.area();
    let width = 44u16.min(screen.width);
    let height = 7u16.min(screen.height);
    let area = Rect {
        x: screen.x + (screen.width - width) / 2,
        y: screen.y + (screen.height - height) / 2,
        width,
        height,
    };
    let yes = app.ui.quit_confirm_selected == 0;
    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(
            format!("Leave {}?", crate::banner::BRAND),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::from(vec![
            button("Quit", yes, true, &palette),
            Span::raw("   "),
            button("Stay", !yes, true, &palette),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.accent));
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}
