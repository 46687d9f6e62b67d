//! Popup text input used for free-form values.

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// State of the open input box.
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// Prompt shown above the field.
    pub prompt: String,
    /// Current value.
    pub value: String,
    /// Cursor position in characters.
    pub cursor: usize,
    /// What to do with the value on confirm.
    pub callback_id: InputCallbackId,
}

/// Destination of a confirmed input value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    /// Path of the model file to upload.
    UploadFilePath,
    /// Free-text requirements for a multi-color print.
    MultiColorDetails,
    /// Quantity on the quote screen.
    QuoteQuantity,
    /// Backend base URL in settings.
    SettingsBaseUrl,
    /// Poll interval in milliseconds in settings.
    SettingsIntervalMs,
    /// Optional poll attempt bound in settings (empty = unbounded).
    SettingsMaxAttempts,
}

impl InputBoxState {
    pub fn new(prompt: &str, value: String, callback_id: InputCallbackId) -> Self {
        let cursor = value.chars().count();
        Self {
            prompt: prompt.into(),
            value,
            cursor,
            callback_id,
        }
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let chars: Vec<char> = self.value.chars().collect();
        let mut new_chars = chars[..self.cursor].to_vec();
        new_chars.push(c);
        new_chars.extend_from_slice(&chars[self.cursor..]);
        self.value = new_chars.iter().collect();
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let chars: Vec<char> = self.value.chars().collect();
            self.value = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.cursor - 1)
                .map(|(_, c)| c)
                .collect();
            self.cursor -= 1;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        let char_count = self.value.chars().count();
        if self.cursor < char_count {
            let chars: Vec<char> = self.value.chars().collect();
            self.value = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.cursor)
                .map(|(_, c)| c)
                .collect();
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_right(&mut self) {
        let char_count = self.value.chars().count();
        if self.cursor < char_count {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Render the input box as a centered popup.
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let inner_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(1), // input field
            Constraint::Length(1),
            Constraint::Length(1), // help
        ])
        .split(popup_area);

    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner_layout[0]);

    // Scroll horizontally when the cursor runs past the visible width.
    let display_width = inner_layout[1].width as usize;
    let scroll_offset = scroll_offset(state.cursor, display_width);

    let chars: Vec<char> = state.value.chars().collect();
    let visible_text: String = chars
        .iter()
        .skip(scroll_offset)
        .take(display_width)
        .collect();

    // Mark the cursor position with a bar character.
    let cursor_pos_in_visible = state.cursor.saturating_sub(scroll_offset);
    let visible_with_cursor = if cursor_pos_in_visible <= visible_text.chars().count() {
        let visible_chars: Vec<char> = visible_text.chars().collect();
        let before: String = visible_chars[..cursor_pos_in_visible.min(visible_chars.len())]
            .iter()
            .collect();
        let after: String = visible_chars[cursor_pos_in_visible.min(visible_chars.len())..]
            .iter()
            .collect();
        format!("{}|{}", before, after)
    } else {
        format!("{}|", visible_text)
    };

    let input_widget = Paragraph::new(visible_with_cursor).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner_layout[1]);

    let help = Paragraph::new("Enter=confirm | ESC=cancel | Ctrl+U=clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner_layout[3]);
}

/// Horizontal scroll keeping the cursor visible, tolerating fields narrower
/// than the two-cell margin.
fn scroll_offset(cursor: usize, display_width: usize) -> usize {
    let keep = display_width.saturating_sub(2);
    if cursor > keep { cursor - keep } else { 0 }
}

/// Compute a centered popup rect.
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_backspace() {
        let mut s = InputBoxState::new("Path:", "widget.stl".into(), InputCallbackId::UploadFilePath);
        assert_eq!(s.cursor, 10);
        s.insert_char('x');
        assert_eq!(s.value, "widget.stlx");
        s.backspace();
        s.backspace();
        assert_eq!(s.value, "widget.st");
    }

    #[test]
    fn test_cursor_movement_bounds() {
        let mut s = InputBoxState::new("Qty:", "3".into(), InputCallbackId::QuoteQuantity);
        s.move_right();
        assert_eq!(s.cursor, 1);
        s.move_home();
        s.move_left();
        assert_eq!(s.cursor, 0);
        s.move_end();
        assert_eq!(s.cursor, 1);
    }

    #[test]
    fn test_scroll_offset_survives_tiny_widths() {
        // Fields narrower than the margin must clamp, not underflow.
        assert_eq!(scroll_offset(5, 0), 5);
        assert_eq!(scroll_offset(5, 1), 5);
        assert_eq!(scroll_offset(5, 2), 5);
        assert_eq!(scroll_offset(0, 0), 0);
        // Normal widths scroll only once the cursor passes the margin.
        assert_eq!(scroll_offset(5, 10), 0);
        assert_eq!(scroll_offset(12, 10), 4);
    }

    #[test]
    fn test_clear_line() {
        let mut s = InputBoxState::new("URL:", "http://x".into(), InputCallbackId::SettingsBaseUrl);
        s.clear_line();
        assert_eq!(s.value, "");
        assert_eq!(s.cursor, 0);
    }
}
