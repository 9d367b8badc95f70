use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

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
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Topics => handle_topics_key(app, key),
        Screen::Lesson => match app.input_mode {
            InputMode::Editing => handle_lesson_editing(app, key),
            InputMode::Normal => handle_lesson_normal(app, key),
        },
    }
}

fn handle_topics_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.topics_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.topics_nav_up(),
        KeyCode::Char('g') => app.topic_state.select(Some(0)),
        KeyCode::Char('G') => {
            let last = app.topics.len().saturating_sub(1);
            app.topic_state.select(Some(last));
        }
        KeyCode::Enter | KeyCode::Char('l') => app.activate_selected_topic(),
        _ => {}
    }
}

fn handle_lesson_editing(app: &mut App, key: KeyEvent) {
    // Submission first: plain Enter sends, Alt-Enter inserts a newline for
    // multi-line payloads
    if key.code == KeyCode::Enter {
        if key.modifiers.contains(KeyModifiers::ALT) {
            insert_char(app, '\n');
        } else {
            app.submit_input();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            if let Some(session) = &mut app.session {
                if session.input_cursor > 0 {
                    session.input_cursor -= 1;
                    let byte_pos = char_to_byte_index(&session.input, session.input_cursor);
                    session.input.remove(byte_pos);
                }
            }
        }
        KeyCode::Delete => {
            if let Some(session) = &mut app.session {
                let char_count = session.input.chars().count();
                if session.input_cursor < char_count {
                    let byte_pos = char_to_byte_index(&session.input, session.input_cursor);
                    session.input.remove(byte_pos);
                }
            }
        }
        KeyCode::Left => {
            if let Some(session) = &mut app.session {
                session.input_cursor = session.input_cursor.saturating_sub(1);
            }
        }
        KeyCode::Right => {
            if let Some(session) = &mut app.session {
                let char_count = session.input.chars().count();
                session.input_cursor = (session.input_cursor + 1).min(char_count);
            }
        }
        KeyCode::Home => {
            if let Some(session) = &mut app.session {
                session.input_cursor = 0;
            }
        }
        KeyCode::End => {
            if let Some(session) = &mut app.session {
                session.input_cursor = session.input.chars().count();
            }
        }
        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn handle_lesson_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        // Back to the topic list; the transcript is discarded
        KeyCode::Esc => app.leave_lesson(),
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            if let Some(session) = &mut app.session {
                session.input_cursor = session.input.chars().count();
            }
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(session) = &mut app.session {
                session.scroll_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(session) = &mut app.session {
                session.scroll_up();
            }
        }
        KeyCode::Char('g') => {
            if let Some(session) = &mut app.session {
                session.scroll_to_top();
            }
        }
        KeyCode::Char('G') => {
            if let Some(session) = &mut app.session {
                session.scroll_to_bottom();
            }
        }

        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    if let Some(session) = &mut app.session {
        let byte_pos = char_to_byte_index(&session.input, session.input_cursor);
        session.input.insert(byte_pos, c);
        session.input_cursor += 1;
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => match app.screen {
            Screen::Topics => app.topics_nav_down(),
            Screen::Lesson => {
                if let Some(session) = &mut app.session {
                    session.scroll_down();
                    session.scroll_down();
                    session.scroll_down();
                }
            }
        },
        MouseEventKind::ScrollUp => match app.screen {
            Screen::Topics => app.topics_nav_up(),
            Screen::Lesson => {
                if let Some(session) = &mut app.session {
                    session.scroll_up();
                    session.scroll_up();
                    session.scroll_up();
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 1);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 5), s.len());
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }
}
