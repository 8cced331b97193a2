use crate::app::{App, AuthRequest, Screen};
use crate::tui::AppEvent;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on any screen
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Auth => handle_auth_key(app, key),
        Screen::Chat => handle_chat_key(app, key),
    }
}

fn handle_auth_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Switch between sign-in and sign-up
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_form();
        }

        KeyCode::Tab | KeyCode::Down => app.next_auth_field(),
        KeyCode::BackTab | KeyCode::Up => app.prev_auth_field(),

        KeyCode::Enter => submit(app),

        KeyCode::Backspace => {
            app.focused_input_mut().pop();
        }
        KeyCode::Char(c) => {
            app.focused_input_mut().push(c);
        }

        _ => {}
    }
}

/// Validate and, if valid, spawn the auth call into the task slot. The slot
/// doubles as the single-flight guard: `submit_auth` refuses while occupied.
fn submit(app: &mut App) {
    match app.submit_auth() {
        Some(AuthRequest::SignIn { email, password }) => {
            let client = app.auth.clone();
            app.auth_task = Some(tokio::spawn(async move {
                client.sign_in(&email, &password).await
            }));
        }
        Some(AuthRequest::SignUp {
            email,
            password,
            name,
        }) => {
            let client = app.auth.clone();
            app.auth_task = Some(tokio::spawn(async move {
                client.sign_up(&email, &password, &name).await
            }));
        }
        None => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.chat_input.clear();
            app.chat_cursor = 0;
        }

        KeyCode::Enter => {
            if let Some(prompt) = app.begin_send() {
                let client = app.gemini.clone();
                let model = app.model.clone();
                app.chat_task = Some(tokio::spawn(async move {
                    client.generate(&model, &prompt).await
                }));
            }
        }

        // Transcript scrolling
        KeyCode::Up => app.chat_scroll_up(),
        KeyCode::Down => app.chat_scroll_down(),

        // Input editing
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{FormMode, MISSING_FIELDS};
    use crate::config::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_char_to_byte_index_ascii() {
        assert_eq!(char_to_byte_index("hello", 0), 0);
        assert_eq!(char_to_byte_index("hello", 3), 3);
        assert_eq!(char_to_byte_index("hello", 99), 5);
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        // 'é' is two bytes
        assert_eq!(char_to_byte_index("café!", 4), 5);
    }

    #[test]
    fn typing_fills_the_focused_field() {
        let mut app = App::new(Config::new());
        for c in "a@b.com".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Tab));
        for c in "pw".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.email_input, "a@b.com");
        assert_eq!(app.password_input, "pw");
    }

    #[test]
    fn ctrl_t_toggles_the_form() {
        let mut app = App::new(Config::new());
        handle_key(&mut app, ctrl('t'));
        assert_eq!(app.form_mode, FormMode::SignUp);
        handle_key(&mut app, ctrl('t'));
        assert_eq!(app.form_mode, FormMode::SignIn);
    }

    #[tokio::test]
    async fn enter_with_empty_form_sets_error_and_spawns_nothing() {
        let mut app = App::new(Config::new());
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.auth_error.as_deref(), Some(MISSING_FIELDS));
        assert!(app.auth_task.is_none());
    }

    #[test]
    fn chat_cursor_editing_is_utf8_safe() {
        let mut app = App::new(Config::new());
        app.screen = Screen::Chat;
        for c in "héllo".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.chat_input, "hélo");
        assert_eq!(app.chat_cursor, 2);

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.chat_input.is_empty());
        assert_eq!(app.chat_cursor, 0);
    }
}
