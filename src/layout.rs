//! Layout helpers for the main screen regions.

use ratatui::prelude::*;

/// Vertical split of the whole frame.
pub struct MainLayout {
    /// Screen body (list + info panel).
    pub body: Rect,
    /// Help bar with the current screen's shortcuts.
    pub help_bar: Rect,
    /// Status bar.
    pub status_bar: Rect,
}

/// Horizontal split of the body.
pub struct BodyLayout {
    /// Primary list or table for the screen.
    pub list: Rect,
    /// Details/info panel.
    pub info_panel: Rect,
}

/// Split the frame into body, help and status regions.
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Split the body into the list (60%) and the info panel (40%).
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    BodyLayout {
        list: chunks[0],
        info_panel: chunks[1],
    }
}
