//! Render functions: view-model in, styled lines out.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::config::BrandColors;
use crate::state::notification::{Toast, ToastKind};
use crate::ui::view::{
    AvatarSize, AvatarView, PostCardView, ProfileHeaderView, SearchResultView, StatView, StoryView, SuggestionView,
    UserCardView,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub accent: Color,
    pub accent_dark: Color,
    pub muted: Color,
    pub liked: Color,
}

impl From<&BrandColors> for Palette {
    fn from(colors: &BrandColors) -> Self {
        Self { accent: colors.accent(), accent_dark: colors.accent_dark(), muted: Color::DarkGray, liked: Color::Red }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::from(&BrandColors::default())
    }
}

fn selected_style(selected: bool, palette: &Palette) -> Style {
    if selected {
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

pub fn avatar_span(avatar: &AvatarView, palette: &Palette) -> Span<'static> {
    let text = match avatar.size {
        AvatarSize::Small => format!("({})", avatar.initials),
        AvatarSize::Medium => format!("( {} )", avatar.initials),
        AvatarSize::Large => format!("(( {} ))", avatar.initials),
    };
    Span::styled(text, Style::default().fg(Color::Black).bg(palette.accent))
}

pub fn render_post_card(view: &PostCardView, selected: bool, palette: &Palette) -> Vec<Line<'static>> {
    let marker = if selected { "▌ " } else { "  " };
    let heart = if view.is_liked {
        Span::styled("♥", Style::default().fg(palette.liked).add_modifier(Modifier::BOLD))
    } else {
        Span::raw("♡")
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(marker, Style::default().fg(palette.accent)),
            avatar_span(&view.avatar, palette),
            Span::raw(" "),
            Span::styled(view.author.clone(), selected_style(selected, palette).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(view.time_ago.clone(), Style::default().fg(palette.muted)),
        ]),
        Line::from(vec![
            Span::raw(marker),
            Span::styled("[image] ", Style::default().fg(palette.muted)),
            Span::styled(view.image_url.clone(), Style::default().add_modifier(Modifier::UNDERLINED)),
        ]),
        Line::from(vec![
            Span::raw(marker),
            heart,
            Span::raw("  💬  ➤"),
            Span::raw("      "),
            Span::styled(view.likes_label.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
    ];
    if let Some(caption) = &view.caption {
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(view.author.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::raw(caption.clone()),
        ]));
    }
    if let Some(comments) = &view.comments_label {
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(comments.clone(), Style::default().fg(palette.muted)),
        ]));
    }
    lines.push(Line::raw(""));
    lines
}

pub fn render_suggestion(view: &SuggestionView, selected: bool, palette: &Palette) -> Vec<Line<'static>> {
    let button_style = if view.followed {
        Style::default().fg(palette.muted)
    } else {
        Style::default().fg(Color::Black).bg(palette.accent)
    };
    vec![
        Line::from(vec![
            avatar_span(&view.avatar, palette),
            Span::raw(" "),
            Span::styled(view.name.clone(), selected_style(selected, palette)),
        ]),
        Line::from(vec![
            Span::styled(format!("    {}  ", view.followers_label), Style::default().fg(palette.muted)),
            Span::styled(format!("[ {} ]", view.button_label()), button_style),
        ]),
    ]
}

pub fn render_search_result(view: &SearchResultView, selected: bool, palette: &Palette) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::raw(if selected { "> " } else { "  " }),
            avatar_span(&view.avatar, palette),
            Span::raw(" "),
            Span::styled(view.name.clone(), selected_style(selected, palette).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(format!("        {}", view.email), Style::default().fg(palette.muted))),
    ]
}

fn render_stats(stats: &[StatView; 3], palette: &Palette) -> Line<'static> {
    let mut spans = Vec::new();
    for stat in stats {
        spans.push(Span::styled(stat.value.clone(), Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)));
        spans.push(Span::styled(format!(" {}   ", stat.label), Style::default().fg(palette.muted)));
    }
    Line::from(spans)
}

pub fn render_user_card(view: &UserCardView, palette: &Palette) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            avatar_span(&view.avatar, palette),
            Span::raw(" "),
            Span::styled(view.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(view.email.clone(), Style::default().fg(palette.muted))),
        Line::raw(""),
        render_stats(&view.stats, palette),
        Line::raw(""),
        Line::from(Span::styled("[ View Profile ]", Style::default().fg(Color::Black).bg(palette.accent_dark))),
    ]
}

pub fn render_profile_header(view: &ProfileHeaderView, palette: &Palette) -> Vec<Line<'static>> {
    let mut title = vec![
        avatar_span(&view.avatar, palette),
        Span::raw("  "),
        Span::styled(view.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(label) = view.follow_button {
        title.push(Span::raw("   "));
        title.push(Span::styled(format!("[ {} ]", label), Style::default().fg(Color::Black).bg(palette.accent)));
    }
    let mut lines = vec![Line::from(title), Line::raw(""), render_stats(&view.stats, palette)];
    if let Some(bio) = &view.bio {
        lines.push(Line::raw(""));
        lines.push(Line::raw(bio.clone()));
    }
    lines
}

pub fn render_story(view: &StoryView, palette: &Palette) -> Vec<Span<'static>> {
    vec![
        avatar_span(&view.avatar, palette),
        Span::raw(format!(" {} ", view.name)),
        Span::styled(format!("{}  ", view.time_ago), Style::default().fg(palette.muted)),
    ]
}

pub fn render_toast(toast: &Toast) -> Vec<Line<'static>> {
    let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Info => Color::Cyan,
    };
    vec![
        Line::from(Span::styled(toast.title.clone(), Style::default().fg(color).add_modifier(Modifier::BOLD))),
        Line::raw(toast.message.clone()),
    ]
}

/// Placeholder block shown for empty or not-yet-loaded sections.
pub fn render_empty_state(icon: &str, title: &str, hint: &str, palette: &Palette) -> Vec<Line<'static>> {
    vec![
        Line::raw(""),
        Line::from(Span::styled(icon.to_string(), Style::default().fg(palette.accent))),
        Line::from(Span::styled(title.to_string(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(palette.muted))),
    ]
}
