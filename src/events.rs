//! UI state shared between input handling and rendering.

/// Screen currently shown in the TUI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Upload entry point: pick a model file, watch job progress.
    Upload,
    /// Color / material / quality selection.
    Customize,
    /// Price breakdown, quantity and multi-part toggle, add to cart.
    Quote,
    /// Frozen cart snapshots and the running total.
    Cart,
    /// All-jobs table with approve/reject.
    Admin,
    /// Backend URL and polling settings.
    Settings,
}

/// Which customize section the arrow keys act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomizeFocus {
    Color,
    Material,
    Quality,
}

/// State shared with the renderer.
#[derive(Clone, Debug)]
pub struct UiState {
    /// Current screen.
    pub screen: Screen,
    /// Selected row in whatever list the screen shows.
    pub selected: usize,
    /// Section focus on the customize screen.
    pub focus: CustomizeFocus,
    /// Log lines for the info panel.
    pub log: Vec<String>,
    /// Status line at the bottom.
    pub status: String,
    /// Error message, highlighted when present.
    pub error: Option<String>,
}

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            selected: 0,
            focus: CustomizeFocus::Color,
            log: vec![],
            status: "Ready".into(),
            error: None,
        }
    }
}
