pub mod auth;
pub mod navigation;
pub mod upload;

use crate::app::App;
use crate::state::{Modal, Screen};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Main input handler dispatcher
pub fn handle_key_event(key: KeyEvent, app: &mut App) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    // Handle quit confirmation dialog
    if app.ui.show_quit_confirm {
        handle_quit_confirm_input(key, app);
        return;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.request_quit();
        return;
    }

    match app.ui.screen {
        Screen::Loading => {
            if key.code == KeyCode::Esc {
                app.request_quit();
            }
        }
        Screen::Login => auth::handle_auth_input(key, app),
        Screen::Main => match app.ui.top_modal() {
            Some(Modal::Upload) => upload::handle_upload_input(key, app),
            Some(Modal::Messaging) => {
                if key.code == KeyCode::Esc {
                    app.close_modals();
                }
            }
            None => navigation::handle_main_input(key, app),
        },
    }
}

fn handle_quit_confirm_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Left | KeyCode::Right => {
            app.ui.quit_confirm_selected = if app.ui.quit_confirm_selected == 0 { 1 } else { 0 };
        }
        KeyCode::Enter => {
            if app.ui.quit_confirm_selected == 0 {
                app.ui.quit();
            }
            app.ui.show_quit_confirm = false;
        }
        KeyCode::Esc => {
            app.ui.show_quit_confirm = false;
        }
        // Ctrl+C again closes the dialog
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.ui.show_quit_confirm = false;
        }
        _ => {}
    }
}
