// client/src/banner.rs

use figlet_rs::FIGfont;
use rand::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub const BRAND: &str = "SocialSpace";

#[derive(Clone)]
struct BufferChar {
    char: char,
    style: Style,
}

/// Figlet rendering of the brand name, or `None` if it can't be built or doesn't fit.
fn figlet_lines(width: u16) -> Option<Vec<String>> {
    let font = FIGfont::standard().ok()?;
    let figure = font.convert(BRAND)?;
    let lines: Vec<String> = figure.to_string().lines().map(str::to_string).collect();
    let figlet_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    (figlet_width <= width as usize).then_some(lines)
}

/// Full banner for the loading and login screens.
///
/// A few cells sparkle with the dark accent on each frame; the rate drifts
/// with `tick_count` so the banner breathes slowly.
pub fn get_styled_banner_lines(width: u16, tick_count: u64, accent: Color, accent_dark: Color) -> Vec<Line<'static>> {
    let Some(figlet) = figlet_lines(width) else {
        return vec![
            Line::raw(""),
            Line::from(Span::styled(BRAND, Style::default().fg(accent).add_modifier(Modifier::BOLD))).centered(),
        ];
    };

    let figlet_width = figlet.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let banner_height = figlet.len() + 2;
    let mut buffer = vec![vec![BufferChar { char: ' ', style: Style::default() }; width as usize]; banner_height];

    let start_y = 1;
    let start_x = (width as usize).saturating_sub(figlet_width) / 2;
    for (y, line) in figlet.iter().enumerate() {
        for (x, c) in line.chars().enumerate() {
            if c == ' ' {
                continue;
            }
            if let Some(cell) = buffer.get_mut(start_y + y).and_then(|row| row.get_mut(start_x + x)) {
                cell.char = c;
                cell.style = Style::default().fg(accent).add_modifier(Modifier::BOLD);
            }
        }
    }

    let mut rng = thread_rng();
    for (y, row) in buffer.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            if cell.char == ' ' {
                continue;
            }
            let chance = 0.002 + (tick_count as f64 * 0.05 + y as f64 * 0.4 + x as f64 * 0.02).sin().powi(2) * 0.01;
            if rng.gen_bool(chance) {
                cell.style = Style::default().fg(accent_dark);
            }
        }
    }

    buffer
        .into_iter()
        .map(|row| {
            let mut spans = Vec::new();
            let mut current_style = Style::default();
            let mut current_text = String::new();

            for cell in row {
                if cell.style == current_style {
                    current_text.push(cell.char);
                } else {
                    if !current_text.is_empty() {
                        spans.push(Span::styled(current_text, current_style));
                    }
                    current_style = cell.style;
                    current_text = String::from(cell.char);
                }
            }
            if !current_text.is_empty() {
                spans.push(Span::styled(current_text, current_style));
            }
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_terminals_get_plain_title() {
        let lines = get_styled_banner_lines(8, 0, Color::Green, Color::DarkGray);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].content, BRAND);
    }

    #[test]
    fn wide_terminals_get_figlet_rows_of_full_width() {
        let lines = get_styled_banner_lines(120, 3, Color::Green, Color::DarkGray);
        assert!(lines.len() > 2);
        for line in &lines {
            assert_eq!(line.width(), 120);
        }
    }
}
