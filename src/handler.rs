use std::path::Path;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

const IDEAS_EXPORT_PATH: &str = "keyword-ideas.txt";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => handle_paste(app, text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_tasks().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Works in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_data_editing(app, key),
        InputMode::PathPrompt => handle_path_prompt(app, key),
    }
}

fn handle_paste(app: &mut App, text: String) {
    // Pasted research data lands in the raw-data buffer regardless of focus;
    // that is the only paste target this tool has.
    if app.input_mode == InputMode::PathPrompt {
        let byte_pos = char_to_byte_index(&app.path_input, app.path_input_cursor);
        app.path_input.insert_str(byte_pos, &text);
        app.path_input_cursor += text.chars().count();
        return;
    }
    let byte_pos = char_to_byte_index(&app.raw_data, app.raw_data_cursor);
    app.raw_data.insert_str(byte_pos, &text);
    app.raw_data_cursor += text.chars().count();
    app.focus = FocusPane::RawData;
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Focus cycle: Images -> Suggestions -> RawData -> Results
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Images => FocusPane::Suggestions,
                FocusPane::Suggestions => FocusPane::RawData,
                FocusPane::RawData => FocusPane::Results,
                FocusPane::Results => FocusPane::Images,
            };
        }
        KeyCode::BackTab => {
            app.focus = match app.focus {
                FocusPane::Images => FocusPane::Results,
                FocusPane::Suggestions => FocusPane::Images,
                FocusPane::RawData => FocusPane::Suggestions,
                FocusPane::Results => FocusPane::RawData,
            };
        }

        // The two flows, triggered from anywhere
        KeyCode::Char('g') => app.start_ideas(),
        KeyCode::Char('r') => app.start_analysis(),

        KeyCode::Char('j') | KeyCode::Down => nav_down(app),
        KeyCode::Char('k') | KeyCode::Up => nav_up(app),

        KeyCode::Char('a') | KeyCode::Char('o') => {
            if app.focus == FocusPane::Images {
                app.path_input.clear();
                app.path_input_cursor = 0;
                app.input_mode = InputMode::PathPrompt;
            }
        }
        KeyCode::Char('x') | KeyCode::Delete => {
            if app.focus == FocusPane::Images {
                app.remove_selected_image();
            }
        }
        KeyCode::Char('y') => {
            if app.focus == FocusPane::Suggestions {
                app.export_suggestions(Path::new(IDEAS_EXPORT_PATH));
            }
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.focus == FocusPane::RawData {
                app.raw_data_cursor = app.raw_data.chars().count();
                app.input_mode = InputMode::Editing;
            }
        }

        _ => {}
    }
}

fn nav_down(app: &mut App) {
    match app.focus {
        FocusPane::Images => select_next(&mut app.image_state, app.images.len()),
        FocusPane::Suggestions => {
            select_next(&mut app.suggestions_state, app.suggested_keywords.len())
        }
        FocusPane::Results => app.results_scroll = app.results_scroll.saturating_add(1),
        FocusPane::RawData => {}
    }
}

fn nav_up(app: &mut App) {
    match app.focus {
        FocusPane::Images => select_prev(&mut app.image_state),
        FocusPane::Suggestions => select_prev(&mut app.suggestions_state),
        FocusPane::Results => app.results_scroll = app.results_scroll.saturating_sub(1),
        FocusPane::RawData => {}
    }
}

fn select_next(state: &mut ratatui::widgets::ListState, len: usize) {
    if len == 0 {
        return;
    }
    let next = match state.selected() {
        Some(i) => (i + 1).min(len - 1),
        None => 0,
    };
    state.select(Some(next));
}

fn select_prev(state: &mut ratatui::widgets::ListState) {
    if let Some(i) = state.selected() {
        state.select(Some(i.saturating_sub(1)));
    }
}

fn handle_data_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let byte_pos = char_to_byte_index(&app.raw_data, app.raw_data_cursor);
            app.raw_data.insert(byte_pos, '\n');
            app.raw_data_cursor += 1;
        }
        KeyCode::Backspace => {
            if app.raw_data_cursor > 0 {
                app.raw_data_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.raw_data, app.raw_data_cursor);
                app.raw_data.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.raw_data.chars().count();
            if app.raw_data_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.raw_data, app.raw_data_cursor);
                app.raw_data.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.raw_data_cursor = app.raw_data_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.raw_data.chars().count();
            app.raw_data_cursor = (app.raw_data_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.raw_data_cursor = 0;
        }
        KeyCode::End => {
            app.raw_data_cursor = app.raw_data.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.raw_data, app.raw_data_cursor);
            app.raw_data.insert(byte_pos, c);
            app.raw_data_cursor += 1;
        }
        _ => {}
    }
}

fn handle_path_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.path_input.clear();
            app.path_input_cursor = 0;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let path = app.path_input.trim().to_string();
            app.path_input.clear();
            app.path_input_cursor = 0;
            app.input_mode = InputMode::Normal;
            if !path.is_empty() {
                app.add_image(Path::new(&path));
            }
        }
        KeyCode::Backspace => {
            if app.path_input_cursor > 0 {
                app.path_input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.path_input, app.path_input_cursor);
                app.path_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.path_input_cursor = app.path_input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.path_input.chars().count();
            app.path_input_cursor = (app.path_input_cursor + 1).min(char_count);
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.path_input, app.path_input_cursor);
            app.path_input.insert(byte_pos, c);
            app.path_input_cursor += 1;
        }
        _ => {}
    }
}
