//! Loading and login/sign-up screens.

use ratatui::{Frame, layout::{Rect, Layout, Constraint}, style::{Style, Color, Modifier}, widgets::{Block, Paragraph, Borders, BorderType}, text::{Line, Span}};
use ratatui::prelude::{Alignment, Direction};
use crate::app::App;
use crate::state::{AuthFocus, AuthMode};
use crate::ui::components::Palette;
use crate::ui::popups::draw_centered_rect;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn draw_loading(f: &mut Frame, app: &App, area: Rect) {
    let frame = SPINNER[(app.ui.tick_count / 3) as usize % SPINNER.len()];
    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(format!("{} Loading...", frame), Style::default().fg(Color::Gray))),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn field_style(focused: bool, palette: &Palette) -> Style {
    if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    }
}

fn button_style(focused: bool, bg: Color) -> Style {
    if focused {
        Style::default().bg(bg).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

pub fn draw_auth_form(f: &mut Frame, app: &App, area: Rect) {
    let palette = Palette::from(&app.config.brand_colors);
    let form = &app.auth;
    let sign_up = form.mode == AuthMode::SignUp;

    let height = if sign_up { 22 } else { 16 };
    let card = centered_fixed(area, 56, height);
    let outer_block = Block::default()
        .title(Line::from(Span::styled(
            format!(" {} ", form.mode.title()),
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )).centered())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    f.render_widget(outer_block, card);

    let mut constraints = vec![Constraint::Length(2)];
    if sign_up {
        constraints.extend([Constraint::Length(3), Constraint::Length(3)]);
    }
    constraints.extend([Constraint::Length(3), Constraint::Length(3), Constraint::Min(1)]);
    let chunks = Layout::default().margin(2).constraints(constraints).split(card);

    f.render_widget(
        Paragraph::new(Span::styled(form.mode.subtitle(), Style::default().fg(palette.muted))).alignment(Alignment::Center),
        chunks[0],
    );

    let mut fields: Vec<(AuthFocus, &str, String)> = Vec::new();
    if sign_up {
        fields.push((AuthFocus::FirstName, "First Name", form.first_name.clone()));
        fields.push((AuthFocus::LastName, "Last Name", form.last_name.clone()));
    }
    fields.push((AuthFocus::Email, "Email", form.email.clone()));
    fields.push((AuthFocus::Password, "Password", "*".repeat(form.password.chars().count())));

    for (i, (focus, title, value)) in fields.iter().enumerate() {
        let chunk = chunks[i + 1];
        let focused = form.focus == *focus;
        f.render_widget(
            Paragraph::new(value.as_str())
                .block(Block::default().borders(Borders::ALL).title(*title))
                .style(field_style(focused, &palette)),
            chunk,
        );
        if focused {
            f.set_cursor_position((chunk.x + value.chars().count() as u16 + 1, chunk.y + 1));
        }
    }

    let button_area = chunks[fields.len() + 1];
    let button_chunks = Layout::default().direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)]).split(button_area);

    let submit_label = if form.submitting { "Please wait..." } else { form.mode.submit_label() };
    f.render_widget(
        Paragraph::new(Span::styled(format!("[ {} ]", submit_label), button_style(form.focus == AuthFocus::Submit, palette.accent)))
            .alignment(Alignment::Center),
        button_chunks[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(format!("[ {} ]", form.mode.toggle_label()), button_style(form.focus == AuthFocus::Toggle, palette.accent_dark)))
            .alignment(Alignment::Center),
        button_chunks[1],
    );
}

/// A `width` x `height` rect centred in `area`, shrunk to fit.
fn centered_fixed(area: Rect, width: u16, height: u16) -> Rect {
    if area.width < width || area.height < height {
        return draw_centered_rect(area, 90, 90);
    }
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
