use crate::app::App;
use crate::state::AuthFocus;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle login / sign-up form input
pub fn handle_auth_input(key: KeyEvent, app: &mut App) {
    if app.auth.submitting {
        return;
    }

    match key.code {
        KeyCode::Esc => app.request_quit(),
        KeyCode::Tab | KeyCode::Down => app.auth.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.auth.focus_prev(),
        KeyCode::Enter => match app.auth.focus {
            AuthFocus::Toggle => app.auth.toggle_mode(),
            AuthFocus::Submit | AuthFocus::Password => app.submit_auth(),
            // Enter in the earlier fields just moves on.
            AuthFocus::FirstName | AuthFocus::LastName | AuthFocus::Email => app.auth.focus_next(),
        },
        KeyCode::Backspace => {
            if let Some(input) = app.auth.focused_input() {
                input.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(input) = app.auth.focused_input() {
                input.push(c);
            }
        }
        _ => {}
    }
}
