use crate::app::App;
use crate::state::UploadFocus;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle input while the create-post modal is open
pub fn handle_upload_input(key: KeyEvent, app: &mut App) {
    if key.code == KeyCode::Esc {
        app.close_modals();
        return;
    }
    // The form is locked while the two calls are in flight.
    if app.upload.submitting {
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => app.upload.focus = app.upload.focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.upload.focus = app.upload.focus.prev(),
        KeyCode::Enter => match app.upload.focus {
            UploadFocus::Path => app.choose_file(),
            UploadFocus::Caption => app.upload.focus = UploadFocus::Submit,
            UploadFocus::Submit => app.submit_upload(),
            UploadFocus::Cancel => app.cancel_upload(),
        },
        KeyCode::Backspace => match app.upload.focus {
            UploadFocus::Path => {
                app.upload.path_input.pop();
            }
            UploadFocus::Caption => {
                app.upload.caption.pop();
            }
            _ => {}
        },
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => match app.upload.focus {
            UploadFocus::Path => app.upload.path_input.push(c),
            UploadFocus::Caption => app.upload.caption.push(c),
            _ => {}
        },
        _ => {}
    }
}
